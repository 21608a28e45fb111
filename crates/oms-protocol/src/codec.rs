//! `tag=value;` encoding and decoding.
//!
//! Framing model (single-message buffer):
//!
//! ```text
//! 8=FIX.4.4;9=<body len>;<tag>=<value>;...;10=<checksum>;
//! ```
//!
//! - BodyLength counts the bytes between the BodyLength pair and the
//!   CheckSum pair.
//! - CheckSum is the sum of every byte before the CheckSum pair, modulo
//!   256, written as three zero-padded digits.
//! - Body pairs are written in ascending tag order. Decoding accepts any
//!   order and drops the header/trailer tags wherever they appear; they are
//!   recomputed on re-encode.
//!
//! NOTE: [`decode`] expects **one message per buffer**. Use
//! [`FrameDecoder`](crate::frame::FrameDecoder) to cut a TCP byte stream
//! into messages first.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::message::{Tag, WireMessage};
use crate::tags::{BEGIN_STRING, BODY_LENGTH, CHECKSUM, DELIMITER, PROTOCOL_VERSION};

/// Errors that can arise when decoding a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("message is not valid UTF-8")]
    InvalidUtf8,

    /// A pair without `=`.
    #[error("missing '=' in pair {0:?}")]
    MissingSeparator(String),

    /// A tag that is not a non-negative integer.
    #[error("invalid tag {0:?}")]
    InvalidTag(String),

    /// The frame does not end with a well-formed CheckSum pair.
    #[error("missing or malformed checksum field")]
    MissingChecksum,

    #[error("checksum mismatch: declared {declared:03}, computed {computed:03}")]
    ChecksumMismatch { declared: u32, computed: u8 },
}

/// Sum of all bytes modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encode a message with header, body length and checksum.
pub fn encode(message: &WireMessage) -> Bytes {
    let mut body = BytesMut::with_capacity(message.len() * 16);
    for (tag, value) in message.iter() {
        put_pair(&mut body, tag, value.as_bytes());
    }

    let mut out = BytesMut::with_capacity(body.len() + 32);
    put_pair(&mut out, BEGIN_STRING, PROTOCOL_VERSION.as_bytes());
    put_pair(&mut out, BODY_LENGTH, body.len().to_string().as_bytes());
    out.put_slice(&body);

    let sum = checksum(&out);
    put_pair(&mut out, CHECKSUM, format!("{:03}", sum).as_bytes());

    out.freeze()
}

/// Decode a single message.
///
/// Fails when a pair has no `=` or a tag is not an integer. The checksum
/// is not checked here; see [`verify_checksum`].
pub fn decode(frame: &[u8]) -> Result<WireMessage, ParseError> {
    let text = std::str::from_utf8(frame).map_err(|_| ParseError::InvalidUtf8)?;

    let mut message = WireMessage::new();
    for pair in text.split(DELIMITER as char).filter(|pair| !pair.is_empty()) {
        let (tag, value) = pair
            .split_once('=')
            .ok_or_else(|| ParseError::MissingSeparator(pair.to_string()))?;

        let tag = tag.trim();
        let tag: Tag = tag
            .parse()
            .map_err(|_| ParseError::InvalidTag(tag.to_string()))?;

        // Header / trailer tags are silently dropped by `set`.
        message.set(tag, value);
    }

    Ok(message)
}

/// Check the trailing CheckSum pair of an encoded frame against its
/// contents.
pub fn verify_checksum(frame: &[u8]) -> Result<(), ParseError> {
    let trimmed = frame
        .strip_suffix(&[DELIMITER])
        .ok_or(ParseError::MissingChecksum)?;

    let start = trimmed
        .iter()
        .rposition(|b| *b == DELIMITER)
        .map_or(0, |pos| pos + 1);

    let digits = trimmed[start..]
        .strip_prefix(b"10=")
        .ok_or(ParseError::MissingChecksum)?;

    let declared: u32 = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ParseError::MissingChecksum)?;

    let computed = checksum(&frame[..start]);
    if declared != u32::from(computed) {
        return Err(ParseError::ChecksumMismatch { declared, computed });
    }

    Ok(())
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn put_pair(out: &mut BytesMut, tag: Tag, value: &[u8]) {
    out.put_slice(tag.to_string().as_bytes());
    out.put_u8(b'=');
    out.put_slice(value);
    out.put_u8(DELIMITER);
}
