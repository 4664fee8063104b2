//! Host I/O pump: drains a real input source into a session.
//!
//! The pump runs on its own thread, forwards every chunk it reads, and always
//! finishes by signalling disconnect so the worker observes end-of-input.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

/// Log target for pump operations.
const PUMP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pump");

/// Name given to the pump thread.
pub const PUMP_THREAD_NAME: &str = "lualsp-pump";

/// Input side of an embedded session.
pub trait HostInput: Send + Sync {
    /// Appends bytes for the worker; returns `false` when they were discarded.
    fn feed_input(&self, bytes: &[u8]) -> bool;

    /// Signals that no further input will arrive.
    fn disconnect(&self);
}

/// Totals reported once the pump stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpSummary {
    /// Bytes accepted by the session.
    pub forwarded: u64,
    /// Whether the pump stopped because the session refused input.
    pub refused: bool,
}

/// Copies `reader` into `input` in chunks of `chunk_size` bytes.
///
/// Stops at end-of-input, on a read error, or when the session refuses a
/// chunk because its worker has finished. Disconnects in every case.
///
/// # Errors
///
/// Returns the read error that stopped the pump.
pub fn pump_input<R, H>(mut reader: R, input: &H, chunk_size: usize) -> io::Result<PumpSummary>
where
    R: Read,
    H: HostInput + ?Sized,
{
    let mut buffer = vec![0_u8; chunk_size.max(1)];
    let mut summary = PumpSummary::default();

    let result = loop {
        match reader.read(&mut buffer) {
            Ok(0) => break Ok(()),
            Ok(count) => {
                let chunk = buffer.get(..count).unwrap_or_default();
                if !input.feed_input(chunk) {
                    debug!(
                        target: PUMP_TARGET,
                        len = count,
                        "session refused input; stopping pump"
                    );
                    summary.refused = true;
                    break Ok(());
                }
                summary.forwarded += u64::try_from(count).unwrap_or(u64::MAX);
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => break Err(error),
        }
    };

    input.disconnect();
    match result {
        Ok(()) => {
            debug!(
                target: PUMP_TARGET,
                forwarded = summary.forwarded,
                refused = summary.refused,
                "input pump finished"
            );
            Ok(summary)
        }
        Err(error) => {
            warn!(
                target: PUMP_TARGET,
                error = %error,
                forwarded = summary.forwarded,
                "input pump stopped on read error"
            );
            Err(error)
        }
    }
}

/// Runs [`pump_input`] on a dedicated thread.
///
/// # Errors
///
/// Returns the spawn error when the thread cannot be created.
pub fn spawn_pump<R, H>(
    reader: R,
    input: H,
    chunk_size: usize,
) -> io::Result<JoinHandle<io::Result<PumpSummary>>>
where
    R: Read + Send + 'static,
    H: HostInput + 'static,
{
    thread::Builder::new()
        .name(PUMP_THREAD_NAME.to_owned())
        .spawn(move || pump_input(reader, &input, chunk_size))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use rstest::rstest;

    use super::*;

    #[derive(Default)]
    struct RecordingInput {
        chunks: Mutex<Vec<Vec<u8>>>,
        disconnects: Mutex<usize>,
        accept: Option<usize>,
    }

    impl RecordingInput {
        fn accepting(limit: usize) -> Self {
            Self {
                accept: Some(limit),
                ..Self::default()
            }
        }

        fn chunks(&self) -> Vec<Vec<u8>> {
            self.chunks.lock().expect("chunks lock").clone()
        }

        fn disconnects(&self) -> usize {
            *self.disconnects.lock().expect("disconnect lock")
        }
    }

    impl HostInput for RecordingInput {
        fn feed_input(&self, bytes: &[u8]) -> bool {
            let mut chunks = self.chunks.lock().expect("chunks lock");
            if self.accept.is_some_and(|limit| chunks.len() >= limit) {
                return false;
            }
            chunks.push(bytes.to_vec());
            true
        }

        fn disconnect(&self) {
            *self.disconnects.lock().expect("disconnect lock") += 1;
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("pipe broke"))
        }
    }

    #[rstest]
    fn forwards_input_in_chunks_then_disconnects() {
        let input = RecordingInput::default();

        let summary =
            pump_input(Cursor::new(b"abcdefg".to_vec()), &input, 3).expect("pump should finish");

        assert_eq!(
            input.chunks(),
            vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]
        );
        assert_eq!(summary.forwarded, 7);
        assert!(!summary.refused);
        assert_eq!(input.disconnects(), 1);
    }

    #[rstest]
    fn empty_input_only_disconnects() {
        let input = RecordingInput::default();

        let summary = pump_input(io::empty(), &input, 16).expect("pump should finish");

        assert!(input.chunks().is_empty());
        assert_eq!(summary, PumpSummary::default());
        assert_eq!(input.disconnects(), 1);
    }

    #[rstest]
    fn read_errors_still_disconnect() {
        let input = RecordingInput::default();

        let result = pump_input(FailingReader, &input, 16);

        assert!(result.is_err());
        assert_eq!(input.disconnects(), 1);
    }

    #[rstest]
    fn refusal_stops_the_pump() {
        let input = RecordingInput::accepting(1);

        let summary =
            pump_input(Cursor::new(b"aabbcc".to_vec()), &input, 2).expect("pump should finish");

        assert_eq!(input.chunks(), vec![b"aa".to_vec()]);
        assert!(summary.refused);
        assert_eq!(summary.forwarded, 2);
        assert_eq!(input.disconnects(), 1);
    }
}
