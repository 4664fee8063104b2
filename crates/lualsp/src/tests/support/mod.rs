//! Shared fixtures and helpers for lifecycle tests.

mod scripted_server;
mod world;

use std::sync::{Arc, Mutex};

pub use scripted_server::{Script, ScriptedServer};
pub use world::TestWorld;

use crate::sink::OutputSink;

/// Output captured from a queue-mode session.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    /// Sink appending every write to the capture.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn OutputSink> {
        let target = Arc::clone(&self.0);
        Arc::new(move |bytes: &[u8]| {
            target.lock().expect("output lock").extend_from_slice(bytes);
        })
    }

    /// Everything written so far.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().expect("output lock").clone()
    }

    /// Everything written so far as text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8(self.bytes()).expect("output should be UTF-8")
    }
}

/// Wraps `body` in an LSP `Content-Length` frame.
#[must_use]
pub fn frame(body: &str) -> Vec<u8> {
    format!("Content-Length: {}\r\n\r\n{body}", body.len()).into_bytes()
}
