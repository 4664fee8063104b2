//! Contract between the worker thread and the embedded server it drives.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::channel::ReadOutcome;
use crate::transport::{Transport, TransportError};

/// Errors reported by embedded server implementations.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ServerError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ServerError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-friendly description without the optional source.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl From<TransportError> for ServerError {
    fn from(error: TransportError) -> Self {
        Self::with_source("transport failure", error)
    }
}

/// What the worker loop should do after one top-level request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep serving.
    Continue,
    /// The server observed end-of-input and has nothing left to do.
    EndOfInput,
}

/// Cooperative termination request shared by the server and the controller.
///
/// Stands in for a process exit call: the server raises it, the controller
/// polls it after every request and leaves the loop normally.
#[derive(Debug, Clone, Default)]
pub struct ShutdownRequest(Arc<AtomicBool>);

impl ShutdownRequest {
    /// Creates a request that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the request. Idempotent.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the request has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Byte-stream view handed to the server on the worker thread.
pub struct ServerIo<'a> {
    transport: &'a Transport,
    shutdown: &'a ShutdownRequest,
}

impl<'a> ServerIo<'a> {
    pub(crate) const fn new(transport: &'a Transport, shutdown: &'a ShutdownRequest) -> Self {
        Self {
            transport,
            shutdown,
        }
    }

    /// Blocking read of exactly `len` bytes, or fewer at end-of-input.
    ///
    /// # Errors
    ///
    /// Propagates [`TransportError`] from the active backend.
    pub fn read(&self, len: usize) -> Result<ReadOutcome, TransportError> {
        self.transport.read(len)
    }

    /// Writes one response chunk.
    ///
    /// # Errors
    ///
    /// Propagates [`TransportError`] from the active backend.
    pub fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.transport.write(bytes)
    }

    /// Asks the worker loop to stop after the current request.
    pub fn request_shutdown(&self) {
        self.shutdown.raise();
    }

    /// Whether a shutdown has been requested.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_raised()
    }

    /// Largest length accepted by [`Self::read`].
    #[must_use]
    pub const fn max_read_len(&self) -> usize {
        self.transport.max_read_len()
    }
}

impl fmt::Debug for ServerIo<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServerIo")
            .field("transport", self.transport)
            .field("shutdown_requested", &self.shutdown.is_raised())
            .finish()
    }
}

/// Behaviour required from a server hosted on the worker thread.
///
/// The worker calls [`Self::boot`] once, then [`Self::serve_one`] until it
/// reports [`Flow::EndOfInput`], returns an error, or a shutdown is requested.
/// A `serve_one` that ignores end-of-stream keeps the worker alive forever;
/// the transport cannot enforce termination on its behalf.
pub trait EmbeddedServer: Send {
    /// Constructs server state and runs its bootstrap sequence.
    ///
    /// # Errors
    ///
    /// Any error is a startup failure; the worker finishes without serving.
    fn boot(&mut self, args: &[String]) -> Result<(), ServerError>;

    /// Reads and answers one top-level request.
    ///
    /// # Errors
    ///
    /// Any error ends the session; it is logged at the thread boundary.
    fn serve_one(&mut self, io: &ServerIo<'_>) -> Result<Flow, ServerError>;
}

impl fmt::Debug for dyn EmbeddedServer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("EmbeddedServer")
    }
}
