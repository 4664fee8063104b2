//! BDD test world wrapping one controller session.

use crate::worker::{WorkerController, WorkerError, WorkerExit};

use super::CapturedOutput;
use super::scripted_server::{Script, ScriptedServer};

/// Shared state exercised by BDD step implementations.
#[derive(Debug)]
pub struct TestWorld {
    /// Session under test.
    pub controller: WorkerController,
    /// Output written by the worker.
    pub output: CapturedOutput,
    /// Exit reported by the last join.
    pub exit: Option<WorkerExit>,
    /// Error returned by the last start.
    pub start_error: Option<WorkerError>,
}

impl TestWorld {
    /// Creates an unstarted queue-mode session.
    #[must_use]
    pub fn new() -> Self {
        let output = CapturedOutput::default();
        let controller = WorkerController::init(["lualsp"], Some(output.sink()));
        Self {
            controller,
            output,
            exit: None,
            start_error: None,
        }
    }

    /// Starts the worker with a scripted server.
    pub fn start(&mut self, script: Script) {
        self.start_error = self.controller.start(ScriptedServer::new(script)).err();
    }

    /// Joins the worker and records its exit.
    pub fn join(&mut self) {
        self.exit = Some(self.controller.join());
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        // Never leave a worker blocked on input behind a finished scenario.
        self.controller.disconnect();
        self.controller.join();
    }
}
