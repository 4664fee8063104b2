//! Blocking single-producer byte queue shared by the host and the worker.
//!
//! The host pump appends bytes from its own thread while the worker blocks in
//! [`ByteChannel::take`] until enough bytes arrive or the input side is
//! disconnected. Once disconnected the channel never accepts bytes again until
//! [`ByteChannel::reset`] starts a new generation.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::transport::TransportError;
use crate::transport::error::check_read_len;

/// Log target for channel operations.
const CHANNEL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::channel");

/// Result of a blocking read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Exactly the requested number of bytes.
    Data(Vec<u8>),
    /// Input ended before the request could be satisfied; holds whatever was
    /// left, possibly nothing.
    EndOfStream(Vec<u8>),
}

impl ReadOutcome {
    /// Bytes carried by the outcome.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Data(bytes) | Self::EndOfStream(bytes) => bytes,
        }
    }

    /// Whether the input side has ended.
    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream(_))
    }
}

#[derive(Debug, Default)]
struct ChannelState {
    buffer: VecDeque<u8>,
    disconnected: bool,
    generation: u64,
}

/// Thread-safe byte buffer with blocking exact-length reads.
#[derive(Debug)]
pub struct ByteChannel {
    state: Mutex<ChannelState>,
    ready: Condvar,
    max_read_len: usize,
}

impl ByteChannel {
    /// Creates an empty, connected channel with the given read ceiling.
    #[must_use]
    pub fn new(max_read_len: usize) -> Self {
        Self {
            state: Mutex::new(ChannelState::default()),
            ready: Condvar::new(),
            max_read_len,
        }
    }

    /// Largest length accepted by [`Self::take`].
    #[must_use]
    pub const fn max_read_len(&self) -> usize {
        self.max_read_len
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        // A panicking reader must not wedge the writer; the state stays
        // consistent because every mutation completes under the lock.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends bytes to the tail and wakes a blocked reader.
    ///
    /// Returns `false` when the channel is disconnected; the bytes are then
    /// discarded.
    pub fn append(&self, bytes: &[u8]) -> bool {
        let mut state = self.lock();
        if state.disconnected {
            debug!(
                target: CHANNEL_TARGET,
                len = bytes.len(),
                "dropping input appended after disconnect"
            );
            return false;
        }
        if bytes.is_empty() {
            return true;
        }
        state.buffer.extend(bytes);
        trace!(
            target: CHANNEL_TARGET,
            appended = bytes.len(),
            buffered = state.buffer.len(),
            "input appended"
        );
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Blocks until `len` bytes are buffered or the channel is disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidReadLength`] without blocking when
    /// `len` is zero or above [`Self::max_read_len`].
    pub fn take(&self, len: usize) -> Result<ReadOutcome, TransportError> {
        check_read_len(len, self.max_read_len)?;
        let guard = self.lock();
        let generation = guard.generation;
        self.drain_when_ready(guard, generation, len)
    }

    /// Like [`Self::take`], but only within `generation`.
    ///
    /// A reader that recorded its generation before a [`Self::reset`] gets an
    /// empty end-of-stream at once instead of waiting in the new session.
    pub(crate) fn take_from(
        &self,
        generation: u64,
        len: usize,
    ) -> Result<ReadOutcome, TransportError> {
        check_read_len(len, self.max_read_len)?;
        self.drain_when_ready(self.lock(), generation, len)
    }

    /// Current session generation, advanced by every [`Self::reset`].
    pub(crate) fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn drain_when_ready(
        &self,
        guard: MutexGuard<'_, ChannelState>,
        generation: u64,
        len: usize,
    ) -> Result<ReadOutcome, TransportError> {
        let mut ready = self
            .ready
            .wait_while(guard, |pending| {
                pending.generation == generation
                    && !pending.disconnected
                    && pending.buffer.len() < len
            })
            .unwrap_or_else(PoisonError::into_inner);

        if ready.generation != generation {
            debug!(
                target: CHANNEL_TARGET,
                "channel reset while a read was pending"
            );
            return Ok(ReadOutcome::EndOfStream(Vec::new()));
        }

        if ready.buffer.len() >= len {
            let bytes: Vec<u8> = ready.buffer.drain(..len).collect();
            return Ok(ReadOutcome::Data(bytes));
        }

        let remaining: Vec<u8> = ready.buffer.drain(..).collect();
        debug!(
            target: CHANNEL_TARGET,
            requested = len,
            returned = remaining.len(),
            "read ended by disconnect"
        );
        Ok(ReadOutcome::EndOfStream(remaining))
    }

    /// Marks the input side as finished and wakes every blocked reader.
    ///
    /// Idempotent and safe from any thread.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        if !state.disconnected {
            state.disconnected = true;
            debug!(
                target: CHANNEL_TARGET,
                buffered = state.buffer.len(),
                "channel disconnected"
            );
        }
        drop(state);
        self.ready.notify_all();
    }

    /// Clears buffered bytes and the disconnect flag for a new session.
    ///
    /// Readers still blocked from the previous session observe end-of-stream.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.buffer.clear();
        state.disconnected = false;
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.ready.notify_all();
    }

    /// Whether [`Self::disconnect`] has been called in this generation.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.lock().disconnected
    }

    /// Number of bytes waiting to be taken.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.lock().buffer.len()
    }
}

#[cfg(test)]
mod tests;
