// crates/oms-protocol/src/orders.rs

//! Order message mapping.
//!
//! Converts between wire messages and the logical `oms_core` types, and
//! builds the execution reports the router, venue and store send:
//!
//! - New order (`35=D`):
//!   `11=ClOrdID; 54=Side; 38=OrderQty; 44=Price; 15=Currency`
//!
//! - Execution report (`35=8`): the order's fields plus
//!   `39=OrdStatus; 150=ExecType; 17=ExecID; 20=ExecTransType`,
//!   and for fills `32=LastQty; 14=CumQty; 151=LeavesQty`.
//!
//! - Order status reply (`35=8; 150=I`): the stored record.

use oms_core::{ExecutionReport, Fill, NewOrder, OrdStatus, OrderRecord};
use thiserror::Error;

use crate::message::{Tag, WireMessage};
use crate::tags::{self, msg_type};
use crate::timestamp;

/// A mandatory field is absent or unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("missing mandatory tag {0}")]
    Missing(Tag),

    #[error("invalid value {value:?} for tag {tag}")]
    Invalid { tag: Tag, value: String },
}

/// ClOrdID (11) of a message; must be present and non-empty.
pub fn cl_ord_id(msg: &WireMessage) -> Result<&str, FieldError> {
    match msg.get(tags::CL_ORD_ID) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(FieldError::Missing(tags::CL_ORD_ID)),
    }
}

/// Read a new-order message.
///
/// Only ClOrdID is mandatory; other attributes default to empty strings.
pub fn parse_new_order(msg: &WireMessage) -> Result<NewOrder, FieldError> {
    let field = |tag| msg.get(tag).unwrap_or_default().to_string();

    Ok(NewOrder {
        cl_ord_id: cl_ord_id(msg)?.to_string(),
        side: field(tags::SIDE),
        quantity: field(tags::ORDER_QTY),
        price: field(tags::PRICE),
        currency: field(tags::CURRENCY),
    })
}

/// Build a new-order message.
pub fn new_order_message(order: &NewOrder) -> WireMessage {
    WireMessage::of_type(msg_type::NEW_ORDER_SINGLE)
        .with(tags::CL_ORD_ID, order.cl_ord_id.as_str())
        .with(tags::SIDE, order.side.as_str())
        .with(tags::ORDER_QTY, order.quantity.as_str())
        .with(tags::PRICE, order.price.as_str())
        .with(tags::CURRENCY, order.currency.as_str())
        .with(tags::TRANSACT_TIME, timestamp::now_utc())
}

/// Read the routing-relevant part of an execution report.
pub fn parse_execution_report(msg: &WireMessage) -> Result<ExecutionReport, FieldError> {
    let cl_ord_id = cl_ord_id(msg)?.to_string();

    let status_code = msg
        .get(tags::ORD_STATUS)
        .ok_or(FieldError::Missing(tags::ORD_STATUS))?;
    let status = OrdStatus::from_code(status_code).ok_or_else(|| FieldError::Invalid {
        tag: tags::ORD_STATUS,
        value: status_code.to_string(),
    })?;

    let exec_type = msg.get(tags::EXEC_TYPE).and_then(OrdStatus::from_code);

    Ok(ExecutionReport {
        cl_ord_id,
        status,
        exec_type,
    })
}

/// Turn an order message into an execution report with `status`.
///
/// All order fields are carried over.
pub fn execution_report(order: &WireMessage, status: OrdStatus, exec_id: &str) -> WireMessage {
    order
        .clone()
        .with(tags::MSG_TYPE, msg_type::EXECUTION_REPORT)
        .with(tags::ORD_STATUS, status.code())
        .with(tags::EXEC_TYPE, status.code())
        .with(tags::EXEC_ID, exec_id)
        .with(tags::EXEC_TRANS_TYPE, tags::EXEC_TRANS_NEW)
}

/// Execution report for one venue fill.
pub fn fill_report(order: &WireMessage, fill: &Fill, exec_id: &str) -> WireMessage {
    execution_report(order, fill.status, exec_id)
        .with(tags::LAST_QTY, fill.last_qty.to_string())
        .with(tags::CUM_QTY, fill.cum_qty.to_string())
        .with(tags::LEAVES_QTY, fill.leaves_qty.to_string())
}

/// Execution report refusing an order.
pub fn reject_report(order: &WireMessage, reason: &str, exec_id: &str) -> WireMessage {
    execution_report(order, OrdStatus::Rejected, exec_id).with(tags::TEXT, sanitize(reason))
}

/// Reply to an order status request from a stored record.
pub fn order_status_reply(record: &OrderRecord) -> WireMessage {
    WireMessage::of_type(msg_type::EXECUTION_REPORT)
        .with(tags::CL_ORD_ID, record.cl_ord_id.as_str())
        .with(tags::ORD_STATUS, record.status.code())
        .with(tags::EXEC_TYPE, tags::EXEC_TYPE_ORDER_STATUS)
        .with(tags::SIDE, record.side.as_str())
        .with(tags::ORDER_QTY, record.quantity.as_str())
        .with(tags::PRICE, record.price.as_str())
        .with(tags::CURRENCY, record.currency.as_str())
        .with(tags::TRANSACT_TIME, timestamp::format_utc(record.updated_at))
}

/// Reply to an order status request for an identifier with no record.
pub fn unknown_order_reply(cl_ord_id: &str) -> WireMessage {
    WireMessage::of_type(msg_type::EXECUTION_REPORT)
        .with(tags::CL_ORD_ID, cl_ord_id)
        .with(tags::EXEC_TYPE, tags::EXEC_TYPE_ORDER_STATUS)
        .with(tags::TEXT, "unknown order")
}

/// Free text must not contain the pair delimiter.
pub fn sanitize(text: &str) -> String {
    text.replace(tags::DELIMITER as char, ",")
}
