//! Error types for the byte transport.

use std::io;

use thiserror::Error;

/// Errors raised by transport reads and writes.
///
/// End-of-input is deliberately absent: it is reported through
/// [`ReadOutcome::EndOfStream`](crate::ReadOutcome::EndOfStream) so callers
/// never confuse a closed stream with a failed one.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A read or write was issued before any backend was activated.
    #[error("transport not ready: no backend has been activated")]
    NotReady,

    /// The requested read length was zero or above the configured ceiling.
    #[error("invalid read length {requested}: expected 1..={max}")]
    InvalidReadLength {
        /// Length requested by the caller.
        requested: usize,
        /// Largest accepted length.
        max: usize,
    },

    /// The underlying standard stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Builds an `InvalidReadLength` error.
    pub(crate) const fn invalid_length(requested: usize, max: usize) -> Self {
        Self::InvalidReadLength { requested, max }
    }
}

/// Validates a read length against the ceiling without touching any state.
pub(crate) const fn check_read_len(requested: usize, max: usize) -> Result<(), TransportError> {
    if requested == 0 || requested > max {
        return Err(TransportError::invalid_length(requested, max));
    }
    Ok(())
}
