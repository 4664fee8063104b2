//! Worker lifecycle: `init → start → feed_input* → disconnect → join`.
//!
//! [`WorkerController`] owns the thread that boots an [`EmbeddedServer`] and
//! drives its request loop over a [`Transport`](crate::Transport). The loop
//! ends when the server reports end-of-input, raises a
//! [`ShutdownRequest`], returns an error, or panics. Every one of those paths
//! is absorbed at the thread boundary and surfaces only as a log line and a
//! [`WorkerExit`] from [`WorkerController::join`].

mod controller;
mod error;
mod panic_trace;
mod server;
mod state;

pub use controller::{InputHandle, WorkerController};
pub use error::WorkerError;
pub use server::{EmbeddedServer, Flow, ServerError, ServerIo, ShutdownRequest};
pub use state::{WorkerExit, WorkerState};

/// Log target for worker operations.
pub(crate) const WORKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::worker");

/// Name given to the worker thread.
///
/// Log lines emitted by the embedded server carry this thread name, and
/// panics raised under it are logged with a backtrace.
pub const WORKER_THREAD_NAME: &str = "lualsp-worker";
