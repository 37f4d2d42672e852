//! Line framing for the relay protocol.
//!
//! [`RecordCodec`] splits the inbound byte stream on `\n` and yields one
//! [`Frame`] per line, and encodes outbound [`Record`]s as compact JSON
//! followed by a single `\n`.
//!
//! The decoder never fails for content problems. A line that is too long or
//! not valid UTF-8 is still yielded as a frame so the read loop can report it
//! and move on; only I/O errors end the stream. This matters because
//! [`tokio_util::codec::FramedRead`] terminates after the first decoder error.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::codec::Framed;
//! use cli_relay::protocol::codec::RecordCodec;
//!
//! let framed = Framed::new(tcp_stream, RecordCodec::new(MAX_LINE_BYTES));
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::Record;
use crate::{AppError, Result};

/// Default maximum inbound line length: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// One inbound line, newline stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line of raw bytes.
    Line(Bytes),
    /// A line longer than the configured limit; its bytes were discarded.
    Oversized,
}

/// Serialize `record` into one `\n`-terminated line.
///
/// # Errors
///
/// Returns `AppError::Encode` if serialization fails or would embed a raw
/// newline in the line.
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let mut bytes =
        serde_json::to_vec(record).map_err(|err| AppError::Encode(err.to_string()))?;
    if bytes.contains(&b'\n') {
        return Err(AppError::Encode(
            "serialized record contains a raw newline".into(),
        ));
    }
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode one line into a record.
///
/// Surrounding whitespace (including a trailing `\r\n`) is ignored.
///
/// # Return value
///
/// - `Ok(Some(record))` for a well-formed line.
/// - `Ok(None)` for a blank line, which is skipped rather than reported.
///
/// # Errors
///
/// Returns `AppError::Decode` for invalid UTF-8 or malformed JSON.
pub fn decode_record(line: &[u8]) -> Result<Option<Record>> {
    let text = std::str::from_utf8(line)
        .map_err(|err| AppError::Decode(format!("invalid utf-8: {err}")))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let record = serde_json::from_str(trimmed)
        .map_err(|err| AppError::Decode(format!("malformed json: {err}")))?;
    Ok(Some(record))
}

/// Newline-delimited codec for [`Record`]s with an inbound length cap.
#[derive(Debug)]
pub struct RecordCodec {
    max_length: usize,
    next_index: usize,
    is_discarding: bool,
}

impl RecordCodec {
    /// Create a codec that discards inbound lines longer than `max_length`.
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            is_discarding: false,
        }
    }

    /// Maximum accepted inbound line length in bytes.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(MAX_LINE_BYTES)
    }
}

impl Decoder for RecordCodec {
    type Item = Frame;
    type Error = AppError;

    /// Return the next complete line, or `Ok(None)` while buffering.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            let read_to = self.max_length.saturating_add(1).min(src.len());
            let newline = src[self.next_index..read_to]
                .iter()
                .position(|byte| *byte == b'\n');

            match (self.is_discarding, newline) {
                (true, Some(offset)) => {
                    src.advance(self.next_index + offset + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                    return Ok(Some(Frame::Oversized));
                }
                (true, None) => {
                    src.advance(read_to);
                    self.next_index = 0;
                    if src.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = self.next_index + offset;
                    self.next_index = 0;
                    let mut line = src.split_to(newline_index + 1);
                    line.truncate(newline_index);
                    return Ok(Some(Frame::Line(line.freeze())));
                }
                (false, None) if src.len() > self.max_length => {
                    self.is_discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    /// Flush a final unterminated line when the peer closes the stream.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        self.next_index = 0;
        if self.is_discarding {
            self.is_discarding = false;
            src.clear();
            return Ok(Some(Frame::Oversized));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let line = src.split_to(src.len());
        Ok(Some(Frame::Line(line.freeze())))
    }
}

impl Encoder<Record> for RecordCodec {
    type Error = AppError;

    /// Append `item` as a single `\n`-terminated JSON line.
    ///
    /// The length cap applies to decoding only.
    fn encode(&mut self, item: Record, dst: &mut BytesMut) -> Result<()> {
        let bytes = encode_record(&item)?;
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}
