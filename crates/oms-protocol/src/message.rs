//! The tag/value message.
//!
//! A [`WireMessage`] is a set of `(tag, value)` pairs keyed by tag. The
//! header and trailer tags (BeginString, BodyLength, CheckSum) are owned by
//! the codec: setting them is ignored and they are recomputed every time
//! the message is serialized.
//!
//! The serialized form is cached; any mutation drops the cache.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use bytes::Bytes;

use crate::codec;
use crate::tags::{self, DELIMITER, MSG_TYPE};

/// Tag number.
pub type Tag = u32;

/// A mutable tag/value message.
///
/// Body pairs are kept in ascending tag order, which is also the order in
/// which they are encoded.
#[derive(Debug, Clone, Default)]
pub struct WireMessage {
    fields: BTreeMap<Tag, String>,
    encoded: OnceLock<Bytes>,
}

impl WireMessage {
    /// An empty message.
    pub fn new() -> Self {
        WireMessage::default()
    }

    /// An empty message with MsgType (35) set.
    pub fn of_type(msg_type: &str) -> Self {
        WireMessage::new().with(MSG_TYPE, msg_type)
    }

    /// Set a tag, replacing any previous value.
    ///
    /// Returns `false` (and leaves the message unchanged) for reserved
    /// header/trailer tags and for values containing the pair delimiter.
    pub fn set(&mut self, tag: Tag, value: impl Into<String>) -> bool {
        if tags::is_reserved(tag) {
            return false;
        }

        let value = value.into();
        if value.as_bytes().contains(&DELIMITER) {
            return false;
        }

        self.fields.insert(tag, value);
        self.encoded = OnceLock::new();
        true
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, tag: Tag, value: impl Into<String>) -> Self {
        self.set(tag, value);
        self
    }

    /// Remove a tag, returning its value.
    pub fn remove(&mut self, tag: Tag) -> Option<String> {
        let removed = self.fields.remove(&tag);
        if removed.is_some() {
            self.encoded = OnceLock::new();
        }
        removed
    }

    pub fn get(&self, tag: Tag) -> Option<&str> {
        self.fields.get(&tag).map(String::as_str)
    }

    pub fn has(&self, tag: Tag) -> bool {
        self.fields.contains_key(&tag)
    }

    /// MsgType (35), if set.
    pub fn msg_type(&self) -> Option<&str> {
        self.get(MSG_TYPE)
    }

    /// Body pairs in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &str)> {
        self.fields.iter().map(|(tag, value)| (*tag, value.as_str()))
    }

    /// Number of body pairs.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialized form, with header and checksum.
    ///
    /// Computed on first use and cached until the next mutation.
    pub fn encoded(&self) -> Bytes {
        self.encoded.get_or_init(|| codec::encode(self)).clone()
    }
}

impl PartialEq for WireMessage {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for WireMessage {}

impl FromIterator<(Tag, String)> for WireMessage {
    fn from_iter<I: IntoIterator<Item = (Tag, String)>>(iter: I) -> Self {
        let mut message = WireMessage::new();
        for (tag, value) in iter {
            message.set(tag, value);
        }
        message
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.encoded()))
    }
}
