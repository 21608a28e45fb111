//! oms-protocol
//!
//! Wire-level encoding/decoding for the order-management system.
//!
//! This crate turns [`WireMessage`]s into bytes and back again, and maps
//! the order-related messages onto `oms_core` types.
//!
//! - [`tags`]      : tag numbers, message types, protocol version
//! - [`message`]   : the mutable tag/value message
//! - [`codec`]     : `tag=value;` encoding, decoding and checksums
//! - [`frame`]     : reassembly of frames from a TCP byte stream
//! - [`orders`]    : new-order / execution-report conversions
//! - [`timestamp`] : UTC SendingTime formatting

pub mod tags;
pub mod message;
pub mod codec;
pub mod frame;
pub mod orders;
pub mod timestamp;

pub use codec::{checksum, decode, encode, verify_checksum, ParseError};
pub use frame::{FrameDecoder, FrameError};
pub use message::{Tag, WireMessage};
pub use orders::FieldError;
