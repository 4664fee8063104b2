//! Selects which byte transport backs the embedded server.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Backend used to carry protocol bytes between the host and the server.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TransportKind {
    /// The server reads the process stdin and writes the process stdout.
    Stdio,
    /// Bytes are pumped into an in-process queue and emitted through a sink.
    #[default]
    Queue,
}

/// Errors encountered while parsing a [`TransportKind`] from text.
pub type TransportKindParseError = strum::ParseError;
