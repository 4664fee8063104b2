//! Stdio backend: blocking reads from an input stream, flushed writes to an
//! output stream.

use std::io::{self, Read, Write};
use std::sync::{Mutex, PoisonError};

use super::error::TransportError;
use crate::channel::ReadOutcome;

/// Input and output streams of the Stdio backend.
pub(crate) struct StdioStreams {
    reader: Mutex<Box<dyn Read + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StdioStreams {
    /// Streams bound to the process stdin and stdout.
    pub(crate) fn process() -> Self {
        Self::new(io::stdin(), io::stdout())
    }

    pub(crate) fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            reader: Mutex::new(Box::new(reader)),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Reads exactly `len` bytes unless the input ends first.
    pub(crate) fn read(&self, len: usize) -> Result<ReadOutcome, TransportError> {
        let mut buffer = vec![0_u8; len];
        let mut filled = 0;
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);

        while filled < len {
            let Some(remaining) = buffer.get_mut(filled..) else {
                break;
            };
            match reader.read(remaining) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(TransportError::Io(error)),
            }
        }

        if filled == len {
            Ok(ReadOutcome::Data(buffer))
        } else {
            buffer.truncate(filled);
            Ok(ReadOutcome::EndOfStream(buffer))
        }
    }

    /// Writes and flushes in one step so no bytes linger in a buffer.
    pub(crate) fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }
}
