//! Embedded server double driven by a fixed script.

use crate::channel::ReadOutcome;
use crate::worker::{EmbeddedServer, Flow, ServerError, ServerIo};

/// Behaviour the scripted server follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Reads four-byte words, answering `ping` with `pong` and echoing the
    /// rest, until input ends.
    PingPong,
    /// Fails during boot.
    FailsToBoot,
    /// Panics on the first request.
    Panics,
    /// Answers the first word with `bye!` and requests shutdown.
    RequestsShutdown,
    /// Fails on the first request.
    Errors,
}

/// Server double that follows a [`Script`].
#[derive(Debug)]
pub struct ScriptedServer {
    script: Script,
}

impl ScriptedServer {
    /// Creates a server following `script`.
    #[must_use]
    pub const fn new(script: Script) -> Self {
        Self { script }
    }
}

impl EmbeddedServer for ScriptedServer {
    fn boot(&mut self, _args: &[String]) -> Result<(), ServerError> {
        match self.script {
            Script::FailsToBoot => Err(ServerError::new("bootstrap script missing")),
            _ => Ok(()),
        }
    }

    fn serve_one(&mut self, io: &ServerIo<'_>) -> Result<Flow, ServerError> {
        let word = match io.read(4)? {
            ReadOutcome::Data(word) => word,
            ReadOutcome::EndOfStream(_) => return Ok(Flow::EndOfInput),
        };
        match self.script {
            Script::Panics => panic!("feature logic exploded"),
            Script::Errors => Err(ServerError::new("feature logic failed")),
            Script::RequestsShutdown => {
                io.write(b"bye!")?;
                io.request_shutdown();
                Ok(Flow::Continue)
            }
            Script::PingPong | Script::FailsToBoot => {
                let reply: &[u8] = if word == b"ping" { b"pong" } else { &word };
                io.write(reply)?;
                Ok(Flow::Continue)
            }
        }
    }
}
