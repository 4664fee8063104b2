//! `Content-Length` framing over [`ServerIo`].

use thiserror::Error;

use crate::channel::ReadOutcome;
use crate::transport::TransportError;
use crate::worker::ServerIo;

/// Largest header block accepted before the blank separator line.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Errors raised while reading or writing framed messages.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The header block did not contain a `Content-Length` header.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// A header line could not be parsed.
    #[error("invalid header line: {line}")]
    InvalidHeader {
        /// The offending line.
        line: String,
    },

    /// The header block exceeded [`MAX_HEADER_BYTES`].
    #[error("header block exceeds {max} bytes")]
    HeaderTooLarge {
        /// Header size limit.
        max: usize,
    },

    /// The declared body length exceeds the transport's read ceiling.
    #[error("message body of {len} bytes exceeds the {max} byte limit")]
    BodyTooLarge {
        /// Declared body length.
        len: usize,
        /// Transport read ceiling.
        max: usize,
    },

    /// Input ended part way through a message.
    #[error("input ended mid-message after {received} bytes")]
    Truncated {
        /// Bytes of the partial message that were received.
        received: usize,
    },
}

/// Reads one framed message.
///
/// Returns `Ok(None)` when input ends cleanly between messages.
///
/// # Errors
///
/// Returns a [`FramingError`] for malformed headers, oversized messages,
/// input that ends mid-message, and transport failures.
pub fn read_message(io: &ServerIo<'_>) -> Result<Option<Vec<u8>>, FramingError> {
    let Some(header) = read_header_block(io)? else {
        return Ok(None);
    };
    let len = parse_content_length(&header)?;
    if len == 0 {
        return Ok(Some(Vec::new()));
    }
    if len > io.max_read_len() {
        return Err(FramingError::BodyTooLarge {
            len,
            max: io.max_read_len(),
        });
    }

    match io.read(len)? {
        ReadOutcome::Data(body) => Ok(Some(body)),
        ReadOutcome::EndOfStream(partial) => Err(FramingError::Truncated {
            received: header.len() + partial.len(),
        }),
    }
}

/// Writes `payload` with its header as a single transport write.
///
/// # Errors
///
/// Returns [`FramingError::Transport`] when the write fails.
pub fn write_message(io: &ServerIo<'_>, payload: &[u8]) -> Result<(), FramingError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    let mut frame = Vec::with_capacity(header.len() + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(payload);
    io.write(&frame)?;
    Ok(())
}

fn read_header_block(io: &ServerIo<'_>) -> Result<Option<Vec<u8>>, FramingError> {
    let mut header = Vec::new();
    while !header.ends_with(HEADER_TERMINATOR) {
        if header.len() >= MAX_HEADER_BYTES {
            return Err(FramingError::HeaderTooLarge {
                max: MAX_HEADER_BYTES,
            });
        }
        match io.read(1)? {
            ReadOutcome::Data(byte) => header.extend_from_slice(&byte),
            ReadOutcome::EndOfStream(_) if header.is_empty() => return Ok(None),
            ReadOutcome::EndOfStream(_) => {
                return Err(FramingError::Truncated {
                    received: header.len(),
                });
            }
        }
    }
    header.truncate(header.len() - HEADER_TERMINATOR.len());
    Ok(Some(header))
}

fn parse_content_length(header: &[u8]) -> Result<usize, FramingError> {
    let text = String::from_utf8_lossy(header);
    let mut content_length = None;
    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            return Err(FramingError::InvalidHeader {
                line: line.to_owned(),
            });
        };
        // Other headers (e.g. Content-Type) are accepted and ignored.
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            let parsed = value
                .trim()
                .parse()
                .map_err(|_| FramingError::InvalidHeader {
                    line: line.to_owned(),
                })?;
            content_length = Some(parsed);
        }
    }
    content_length.ok_or(FramingError::MissingContentLength)
}
