//! Lifecycle states of the embedded-server session.

use std::fmt;
use std::thread::JoinHandle;

/// Observable state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No worker thread has been spawned.
    NotStarted,
    /// The worker thread is booting or serving.
    Running,
    /// The worker thread's entry routine has returned.
    Finished,
}

/// How the worker thread ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// `join` was called before the worker was started.
    NeverStarted,
    /// The server observed end-of-input.
    EndOfInput,
    /// The server requested a cooperative shutdown.
    ShutdownRequested,
    /// Server construction or bootstrap failed.
    StartupFailed,
    /// The server returned an error while serving.
    Failed,
    /// The server panicked.
    Panicked,
}

impl WorkerExit {
    /// Whether the server ran and stopped through a designed exit path.
    #[must_use]
    pub const fn is_clean(self) -> bool {
        matches!(self, Self::EndOfInput | Self::ShutdownRequested)
    }

    /// Process exit status for this outcome.
    ///
    /// Only a server that never got going is reported as a failure; every
    /// other ending, including runtime errors already logged at the worker
    /// boundary, maps to success.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::StartupFailed => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NeverStarted => "never started",
            Self::EndOfInput => "end of input",
            Self::ShutdownRequested => "shutdown requested",
            Self::StartupFailed => "startup failed",
            Self::Failed => "failed",
            Self::Panicked => "panicked",
        };
        formatter.write_str(label)
    }
}

/// Internal session slot guarded by the controller.
pub(crate) enum Session {
    /// Thread not spawned yet.
    NotStarted,
    /// Thread spawned; the handle is taken by the first joining thread.
    Started(Option<JoinHandle<()>>),
}
