//! Newline framing for the text protocol.

use crate::error::ProtocolError;
use crate::MAX_LINE_BYTES;
use bytes::{BufMut, Bytes, BytesMut};

/// Encodes a single outbound line, appending the terminating newline.
pub fn encode_line(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + 1);
    buf.put_slice(line.as_bytes());
    buf.put_u8(b'\n');
    buf.freeze()
}

/// Splits an inbound byte stream into complete lines.
///
/// Bytes after the last newline stay buffered until more data arrives. A
/// partial line that grows past the limit is reported once and then dropped
/// up to the next newline, so a stalled peer cannot grow the buffer without
/// bound.
pub struct LineDecoder {
    buffer: BytesMut,
    max_line: usize,
    discarding: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }

    /// Creates a decoder with a custom line limit.
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_line,
            discarding: false,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next non-empty line.
    ///
    /// The returned line has the newline, a trailing carriage return and
    /// surrounding whitespace removed.
    pub fn decode_line(&mut self) -> Result<Option<String>, ProtocolError> {
        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                if self.discarding {
                    self.buffer.clear();
                } else if self.buffer.len() > self.max_line {
                    self.buffer.clear();
                    self.discarding = true;
                    return Err(ProtocolError::LineTooLong { max: self.max_line });
                }
                return Ok(None);
            };

            let line = self.buffer.split_to(pos + 1);
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if pos > self.max_line {
                return Err(ProtocolError::LineTooLong { max: self.max_line });
            }

            let text = std::str::from_utf8(&line[..pos]).map_err(|_| ProtocolError::InvalidUtf8)?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            return Ok(Some(text.to_string()));
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the configured line limit.
    pub fn max_line(&self) -> usize {
        self.max_line
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
