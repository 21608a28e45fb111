//! Tag numbers, message types and other wire constants.
//!
//! Tags follow FIX 4.4 numbering; the admin sub-protocol uses two tags from
//! the user-defined range.

use crate::message::Tag;

/// Value of BeginString (8).
pub const PROTOCOL_VERSION: &str = "FIX.4.4";

/// Terminates every `tag=value` pair.
pub const DELIMITER: u8 = b';';

/// Separates a tag from its value.
pub const SEPARATOR: u8 = b'=';

// Header / trailer (computed at serialization time, never set by callers)
pub const BEGIN_STRING: Tag = 8;
pub const BODY_LENGTH: Tag = 9;
pub const CHECKSUM: Tag = 10;

pub const CL_ORD_ID: Tag = 11;
pub const CUM_QTY: Tag = 14;
pub const CURRENCY: Tag = 15;
pub const EXEC_ID: Tag = 17;
pub const EXEC_TRANS_TYPE: Tag = 20;
pub const LAST_QTY: Tag = 32;
pub const MSG_TYPE: Tag = 35;
pub const ORDER_QTY: Tag = 38;
pub const ORD_STATUS: Tag = 39;
pub const PRICE: Tag = 44;
pub const SENDER_SUB_ID: Tag = 50;
pub const SENDING_TIME: Tag = 52;
pub const SIDE: Tag = 54;
pub const TEXT: Tag = 58;
pub const TRANSACT_TIME: Tag = 60;
pub const EXEC_TYPE: Tag = 150;
pub const LEAVES_QTY: Tag = 151;

/// Admin command name on a `QR` request.
pub const ADMIN_COMMAND: Tag = 10001;

/// Free-text payload on a `QR` response.
pub const ADMIN_RESPONSE: Tag = 10002;

/// True for the tags the codec owns.
pub fn is_reserved(tag: Tag) -> bool {
    matches!(tag, BEGIN_STRING | BODY_LENGTH | CHECKSUM)
}

/// MsgType (35) values.
pub mod msg_type {
    pub const NEW_ORDER_SINGLE: &str = "D";
    pub const EXECUTION_REPORT: &str = "8";
    pub const ORDER_STATUS_REQUEST: &str = "H";

    /// Admin request and response share this type; the presence of
    /// AdminCommand or AdminResponse tells them apart.
    pub const ADMIN: &str = "QR";
}

/// ExecType (150) value for an order status reply.
pub const EXEC_TYPE_ORDER_STATUS: &str = "I";

/// ExecTransType (20) value for a new transaction.
pub const EXEC_TRANS_NEW: &str = "0";
