//! Output sinks receiving bytes written by the embedded server.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

/// Log target for sink operations.
const SINK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::sink");

/// Destination for protocol bytes produced by the embedded server.
///
/// `emit` runs synchronously on the worker thread, once per non-empty write,
/// in write order. Implementations must not block indefinitely.
pub trait OutputSink: Send + Sync {
    /// Delivers one write's worth of bytes.
    fn emit(&self, bytes: &[u8]);
}

impl<F> OutputSink for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn emit(&self, bytes: &[u8]) {
        self(bytes);
    }
}

impl fmt::Debug for dyn OutputSink {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("OutputSink")
    }
}

/// Sink forwarding bytes to a writer, flushing after every write.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wraps `writer`.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl WriterSink<io::Stdout> {
    /// Sink for the process stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn emit(&self, bytes: &[u8]) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = writer.write_all(bytes).and_then(|()| writer.flush()) {
            warn!(
                target: SINK_TARGET,
                error = %error,
                len = bytes.len(),
                "failed to forward output"
            );
        }
    }
}

impl<W> fmt::Debug for WriterSink<W> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("WriterSink").finish_non_exhaustive()
    }
}
