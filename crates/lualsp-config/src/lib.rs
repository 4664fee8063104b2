//! Shared configuration for the embedded language server host.
//!
//! Settings are layered with `ortho_config`: built-in defaults, an optional
//! configuration file (`--config-path` or `LUALSP_CONFIG_PATH`), `LUALSP_*`
//! environment variables, then command-line flags. The binary and the C ABI
//! both consume the resulting [`Config`].

mod defaults;
mod logging;
mod transport;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_INPUT_CHUNK_SIZE, DEFAULT_LOG_FILTER, DEFAULT_MAX_READ_LEN, default_input_chunk_size,
    default_log_filter, default_log_filter_string, default_log_format, default_max_read_len,
    default_transport,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use transport::{TransportKind, TransportKindParseError};

/// Command-line flags understood by the configuration loader.
///
/// Flags listed here must precede any arguments destined for the embedded
/// server.
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--transport",
    "--max-read-len",
    "--input-chunk-size",
    "--resource-dir-override",
];

/// Runtime configuration for the host process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "LUALSP")]
pub struct Config {
    /// `tracing` filter expression applied to diagnostics on stderr.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of diagnostics.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Byte transport used by the embedded server.
    #[serde(default = "default_transport")]
    #[ortho_config(default = default_transport())]
    pub transport: TransportKind,
    /// Largest read the embedded server may request in one call.
    #[serde(default = "default_max_read_len")]
    #[ortho_config(default = default_max_read_len())]
    pub max_read_len: usize,
    /// Buffer size used when pumping host input into the queue.
    #[serde(default = "default_input_chunk_size")]
    #[ortho_config(default = default_input_chunk_size())]
    pub input_chunk_size: usize,
    /// Resource directory handed to the server when none is supplied.
    #[serde(default)]
    pub resource_dir_override: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            transport: default_transport(),
            max_read_len: default_max_read_len(),
            input_chunk_size: default_input_chunk_size(),
            resource_dir_override: None,
        }
    }
}

impl Config {
    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Selected transport backend.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Read ceiling applied by both transport backends.
    #[must_use]
    pub const fn max_read_len(&self) -> usize {
        self.max_read_len
    }

    /// Pump buffer size.
    #[must_use]
    pub const fn input_chunk_size(&self) -> usize {
        self.input_chunk_size
    }

    /// Resource directory configured outside the server arguments.
    #[must_use]
    pub fn resource_dir_override(&self) -> Option<&Utf8Path> {
        self.resource_dir_override.as_deref()
    }

    /// Rejects settings that would leave the transport unusable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroLimit`] when a size limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_read_len == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_read_len",
            });
        }
        if self.input_chunk_size == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "input_chunk_size",
            });
        }
        Ok(())
    }
}

/// Semantic errors detected after the layers have been merged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A size limit was configured as zero.
    #[error("configuration value '{field}' must be greater than zero")]
    ZeroLimit {
        /// Name of the offending field.
        field: &'static str,
    },
}
