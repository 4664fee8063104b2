//! Errors raised by the worker lifecycle controller.

use std::io;

use thiserror::Error;

/// Contract violations and spawn failures reported to the host.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// `start` was called on a session that already started.
    #[error("worker already started")]
    AlreadyStarted,

    /// The operating system refused to spawn the worker thread.
    #[error("failed to spawn worker thread: {source}")]
    Spawn {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
