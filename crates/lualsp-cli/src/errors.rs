//! Error types for the binary runtime.

use std::io;
use std::sync::Arc;

use lualsp::WorkerError;
use lualsp::telemetry::TelemetryError;
use lualsp_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to start the language server worker: {0}")]
    StartWorker(#[from] WorkerError),
    #[error("failed to start the input pump: {0}")]
    SpawnPump(io::Error),
}
