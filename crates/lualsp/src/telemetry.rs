//! Structured telemetry initialisation for embedded sessions.
//!
//! Logs always go to stderr: stdout carries protocol bytes in both
//! transport modes, so a stray log line there would corrupt a frame.
//!
//! Every event records the name of the thread that emitted it, which tells a
//! host which side of the session spoke:
//!
//! - [`WORKER_THREAD_NAME`](crate::WORKER_THREAD_NAME) marks the embedded
//!   server, including panics absorbed at the worker boundary.
//! - [`PUMP_THREAD_NAME`](crate::PUMP_THREAD_NAME) marks the thread draining
//!   host input into the session.
//! - Any other name is the host's own thread calling into the controller or
//!   the C ABI.
//!
//! Hosts that install their own subscriber before [`initialise`] keep it;
//! they should enable thread names to retain the distinction.

use std::io::{self, IsTerminal};

use lualsp_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// The host already installed a global subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the stderr subscriber on the first successful call.
///
/// Later calls leave the global state alone and return a fresh
/// [`TelemetryHandle`], so the C ABI can call this on every `LSPInit`.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another
/// subscriber was already installed by the host.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn session_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))
}

/// Colour codes only help a person reading a terminal.
fn use_ansi(format: LogFormat) -> bool {
    !format.is_structured() && io::stderr().is_terminal()
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = session_filter(config)?;
    let format = config.log_format();

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(use_ansi(format))
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
