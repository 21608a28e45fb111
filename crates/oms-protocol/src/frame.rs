//! Stream framing.
//!
//! TCP gives no message boundaries: one read may carry half a message or
//! several. [`FrameDecoder`] buffers bytes per connection and cuts out
//! complete frames.
//!
//! A frame that opens with the canonical `8=...;9=N;` header ends with the
//! CheckSum pair that follows its N body bytes. Anything else is scanned
//! pair by pair: the frame ends at a CheckSum pair once MsgType has been
//! seen, or just before a second BeginString pair. Reserved tags may
//! therefore sit anywhere inside a frame.
//!
//! Whitespace between frames (e.g. newlines typed into netcat) is skipped.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

use crate::tags::DELIMITER;

/// Default upper bound for an unterminated frame.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

const BEGIN_STRING_PREFIX: &[u8] = b"8=";
const BODY_LENGTH_PREFIX: &[u8] = b"9=";
const MSG_TYPE_PREFIX: &[u8] = b"35=";
const CHECKSUM_PREFIX: &[u8] = b"10=";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Frame longer than `max` bytes; it is skipped up to its trailer or
    /// the next BeginString pair.
    #[error("frame of {len} bytes exceeds the {max} byte limit; frame discarded")]
    Oversized { len: usize, max: usize },
}

/// Where the canonical header says the frame ends.
enum Header {
    /// No usable `8=...;9=N;` header, or its BodyLength does not line up
    /// with a CheckSum pair.
    Absent,
    Pending,
    Complete(usize),
    TooLong { header_len: usize, frame_len: usize },
}

/// Reassembles frames from a byte stream.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_len: usize,
    // Set after an oversized frame: its remaining bytes are still arriving.
    resync: bool,
    // Whether the buffer starts at a pair boundary while resyncing.
    at_boundary: bool,
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        FrameDecoder {
            buf: BytesMut::with_capacity(4096),
            max_frame_len,
            resync: false,
            at_boundary: true,
        }
    }

    /// Append bytes read from the stream.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete frame, if one is buffered.
    ///
    /// Call repeatedly until it returns `Ok(None)`.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, FrameError> {
        if self.resync && !self.skip_discarded() {
            return Ok(None);
        }

        let leading = self
            .buf
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.buf.advance(leading);

        let end = match self.declared_end() {
            Header::Complete(end) => Some(end),
            Header::Pending => None,
            Header::Absent => self.scanned_end(),
            Header::TooLong {
                header_len,
                frame_len,
            } => {
                // The header is consumed; the body is skipped as it arrives.
                self.buf.advance(header_len);
                self.resync = true;
                self.at_boundary = true;
                return Err(FrameError::Oversized {
                    len: frame_len,
                    max: self.max_frame_len,
                });
            }
        };

        if let Some(end) = end {
            return Ok(Some(self.buf.split_to(end).freeze()));
        }

        if self.buf.len() > self.max_frame_len {
            let len = self.buf.len();
            self.at_boundary = self.buf.last().is_some_and(|b| is_boundary(*b));
            self.buf.clear();
            self.resync = true;
            return Err(FrameError::Oversized {
                len,
                max: self.max_frame_len,
            });
        }

        Ok(None)
    }

    fn declared_end(&self) -> Header {
        let buf = &self.buf[..];
        if !buf.starts_with(BEGIN_STRING_PREFIX) {
            return Header::Absent;
        }
        let Some(first) = find_delimiter(buf, 0) else {
            return Header::Absent;
        };
        let Some(second) = find_delimiter(buf, first + 1) else {
            return Header::Absent;
        };
        let Some(body_len) = buf[first + 1..second]
            .strip_prefix(BODY_LENGTH_PREFIX)
            .and_then(|digits| std::str::from_utf8(digits).ok())
            .and_then(|digits| digits.parse::<usize>().ok())
        else {
            return Header::Absent;
        };

        let header_len = second + 1;
        if body_len > self.max_frame_len {
            return Header::TooLong {
                header_len,
                frame_len: header_len + body_len,
            };
        }

        let body_end = header_len + body_len;
        if buf.len() < body_end + CHECKSUM_PREFIX.len() {
            return Header::Pending;
        }
        if !buf[body_end..].starts_with(CHECKSUM_PREFIX) {
            return Header::Absent;
        }
        match find_delimiter(buf, body_end) {
            Some(end) => Header::Complete(end + 1),
            None => Header::Pending,
        }
    }

    fn scanned_end(&self) -> Option<usize> {
        let buf = &self.buf[..];
        let mut has_begin = false;
        let mut has_type = false;

        let mut pair_start = 0;
        while let Some(end) = find_delimiter(buf, pair_start) {
            let pair = trim_start(&buf[pair_start..end]);
            if pair.starts_with(BEGIN_STRING_PREFIX) {
                if has_begin {
                    return Some(pair_start);
                }
                has_begin = true;
            } else if pair.starts_with(MSG_TYPE_PREFIX) {
                has_type = true;
            } else if has_type && pair.starts_with(CHECKSUM_PREFIX) {
                return Some(end + 1);
            }
            pair_start = end + 1;
        }

        None
    }

    /// Drop the rest of a discarded frame: everything up to the next
    /// BeginString pair or through the next CheckSum pair. Returns true
    /// once the buffer is back at a frame boundary.
    fn skip_discarded(&mut self) -> bool {
        let mut pair_start = 0;
        while let Some(end) = find_delimiter(&self.buf, pair_start) {
            let whole_pair = pair_start > 0 || self.at_boundary;
            let pair = trim_start(&self.buf[pair_start..end]);
            if whole_pair && pair.starts_with(BEGIN_STRING_PREFIX) {
                return self.resynced(pair_start);
            }
            if whole_pair && pair.starts_with(CHECKSUM_PREFIX) {
                return self.resynced(end + 1);
            }
            pair_start = end + 1;
        }

        let whole_pair = pair_start > 0 || self.at_boundary;
        if whole_pair && trim_start(&self.buf[pair_start..]).starts_with(BEGIN_STRING_PREFIX) {
            return self.resynced(pair_start);
        }

        if pair_start > 0 {
            self.buf.advance(pair_start);
            self.at_boundary = true;
        }
        if self.buf.len() > self.max_frame_len {
            self.at_boundary = self.buf.last().is_some_and(|b| is_boundary(*b));
            self.buf.clear();
        }
        false
    }

    fn resynced(&mut self, skip: usize) -> bool {
        self.buf.advance(skip);
        self.resync = false;
        self.at_boundary = true;
        true
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        FrameDecoder::new(DEFAULT_MAX_FRAME_LEN)
    }
}

// ----- Helpers -----

fn find_delimiter(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .iter()
        .position(|b| *b == DELIMITER)
        .map(|offset| from + offset)
}

fn trim_start(pair: &[u8]) -> &[u8] {
    let skip = pair.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &pair[skip..]
}

fn is_boundary(byte: u8) -> bool {
    byte == DELIMITER || byte.is_ascii_whitespace()
}
