//! Transport selector giving the embedded server one blocking byte stream.
//!
//! A [`Transport`] is owned by a single embedded session. It starts
//! [`TransportMode::Uninitialized`]; activating a backend selects either the
//! process standard streams or the in-process [`ByteChannel`] plus an
//! [`OutputSink`]. Every activation resets the channel so a new session never
//! sees bytes or a disconnect left over from the previous one.

pub(crate) mod error;
mod stdio;

use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

pub use self::error::TransportError;
use self::error::check_read_len;
use self::stdio::StdioStreams;
use crate::channel::{ByteChannel, ReadOutcome};
use crate::sink::OutputSink;

/// Log target for transport operations.
const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Backend currently serving reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// No backend has been activated.
    Uninitialized,
    /// Standard streams.
    Stdio,
    /// In-process queue with an output sink.
    Queue,
}

enum Backend {
    Uninitialized,
    Stdio(Arc<StdioStreams>),
    Queue(Option<Arc<dyn OutputSink>>),
}

impl Backend {
    const fn mode(&self) -> TransportMode {
        match self {
            Self::Uninitialized => TransportMode::Uninitialized,
            Self::Stdio(_) => TransportMode::Stdio,
            Self::Queue(_) => TransportMode::Queue,
        }
    }
}

/// Duplex byte transport with interchangeable backends.
pub struct Transport {
    backend: RwLock<Backend>,
    channel: ByteChannel,
}

impl Transport {
    /// Creates an uninitialised transport whose reads are capped at
    /// `max_read_len` bytes.
    #[must_use]
    pub fn new(max_read_len: usize) -> Self {
        Self {
            backend: RwLock::new(Backend::Uninitialized),
            channel: ByteChannel::new(max_read_len),
        }
    }

    /// Largest read accepted by [`Self::read`].
    #[must_use]
    pub const fn max_read_len(&self) -> usize {
        self.channel.max_read_len()
    }

    /// Backend currently selected.
    #[must_use]
    pub fn mode(&self) -> TransportMode {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .mode()
    }

    /// Selects the process standard streams.
    pub fn activate_stdio(&self) {
        self.install(Backend::Stdio(Arc::new(StdioStreams::process())));
    }

    /// Selects the Stdio backend over caller-owned streams.
    pub fn activate_streams<R, W>(&self, reader: R, writer: W)
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        self.install(Backend::Stdio(Arc::new(StdioStreams::new(reader, writer))));
    }

    /// Selects the queue backend, emitting writes to `sink`.
    ///
    /// Without a sink, writes are accepted and discarded.
    pub fn activate_queue(&self, sink: Option<Arc<dyn OutputSink>>) {
        self.install(Backend::Queue(sink));
    }

    fn install(&self, backend: Backend) {
        let mode = backend.mode();
        let mut slot = self.backend.write().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.mode();
        self.channel.reset();
        *slot = backend;
        drop(slot);
        info!(
            target: TRANSPORT_TARGET,
            ?previous,
            ?mode,
            "transport backend activated"
        );
    }

    /// Reads exactly `len` bytes, or fewer once input has ended.
    ///
    /// Blocks the calling thread until the request can be answered.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotReady`] before activation,
    /// [`TransportError::InvalidReadLength`] for a zero or oversized `len`,
    /// and [`TransportError::Io`] when the Stdio backend fails.
    pub fn read(&self, len: usize) -> Result<ReadOutcome, TransportError> {
        // The queue generation is recorded under the backend lock so a mode
        // switch racing this read cannot leave it waiting on the new session.
        let source = {
            let backend = self.backend.read().unwrap_or_else(PoisonError::into_inner);
            match &*backend {
                Backend::Uninitialized => return Err(TransportError::NotReady),
                Backend::Stdio(streams) => ReadSource::Stdio(Arc::clone(streams)),
                Backend::Queue(_) => ReadSource::Queue(self.channel.generation()),
            }
        };

        match source {
            ReadSource::Stdio(streams) => {
                check_read_len(len, self.max_read_len())?;
                streams.read(len)
            }
            ReadSource::Queue(generation) => self.channel.take_from(generation, len),
        }
    }

    /// Writes `bytes` to the active output.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotReady`] before activation and
    /// [`TransportError::Io`] when the Stdio backend fails.
    pub fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let target = {
            let backend = self.backend.read().unwrap_or_else(PoisonError::into_inner);
            match &*backend {
                Backend::Uninitialized => return Err(TransportError::NotReady),
                Backend::Stdio(streams) => WriteTarget::Stdio(Arc::clone(streams)),
                Backend::Queue(sink) => WriteTarget::Sink(sink.clone()),
            }
        };

        match target {
            WriteTarget::Stdio(streams) => streams.write(bytes),
            WriteTarget::Sink(Some(sink)) => {
                if !bytes.is_empty() {
                    sink.emit(bytes);
                }
                Ok(())
            }
            WriteTarget::Sink(None) => Ok(()),
        }
    }

    /// Buffers host input for the queue backend.
    ///
    /// Returns `false` when the bytes were discarded: outside queue mode, or
    /// after the input side was disconnected.
    pub fn feed(&self, bytes: &[u8]) -> bool {
        if self.mode() != TransportMode::Queue {
            debug!(
                target: TRANSPORT_TARGET,
                len = bytes.len(),
                "discarding input fed outside queue mode"
            );
            return false;
        }
        self.channel.append(bytes)
    }

    /// Signals end-of-input.
    ///
    /// Releases any read blocked on the queue. The Stdio backend ignores the
    /// signal because its host ends input by closing the stream.
    pub fn disconnect(&self) {
        match self.mode() {
            TransportMode::Queue => self.channel.disconnect(),
            mode => debug!(
                target: TRANSPORT_TARGET,
                ?mode,
                "disconnect ignored outside queue mode"
            ),
        }
    }

    /// Closes the queue's input side regardless of the current mode.
    pub(crate) fn close_input(&self) {
        self.channel.disconnect();
    }

    /// Channel backing the queue backend.
    #[cfg(test)]
    pub(crate) const fn channel(&self) -> &ByteChannel {
        &self.channel
    }
}

enum ReadSource {
    Stdio(Arc<StdioStreams>),
    Queue(u64),
}

enum WriteTarget {
    Stdio(Arc<StdioStreams>),
    Sink(Option<Arc<dyn OutputSink>>),
}

impl fmt::Debug for Transport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Transport")
            .field("mode", &self.mode())
            .field("buffered", &self.channel.buffered_len())
            .field("disconnected", &self.channel.is_disconnected())
            .finish()
    }
}
