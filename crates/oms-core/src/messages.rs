//! Logical order messages.
//!
//! These are **transport-agnostic**:
//! - [`NewOrder`]: what a client submits.
//! - [`ExecutionReport`]: the status-bearing part of a report.
//! - [`Fill`]: one execution produced by the venue simulator.
//!
//! Order attributes stay as the strings they arrived as; only the code
//! that needs a number (the venue) parses them.

use crate::order_status::OrdStatus;
use crate::side::Side;

/// New order single (input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Client-assigned order identifier.
    pub cl_ord_id: String,

    /// Side code as sent (`"1"` buy, `"2"` sell).
    pub side: String,

    /// Order quantity as sent.
    pub quantity: String,

    /// Limit price as sent, e.g. `"100.00"`.
    pub price: String,

    /// Currency, e.g. `"GBP"`.
    pub currency: String,
}

impl NewOrder {
    /// Convenience constructor used by clients and tests.
    pub fn new(
        cl_ord_id: impl Into<String>,
        side: Side,
        quantity: u64,
        price: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        NewOrder {
            cl_ord_id: cl_ord_id.into(),
            side: side.code().to_string(),
            quantity: quantity.to_string(),
            price: price.into(),
            currency: currency.into(),
        }
    }

    /// Parsed side, if the code is recognised.
    pub fn side(&self) -> Option<Side> {
        Side::from_code(&self.side)
    }
}

/// The routing-relevant part of an execution report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub cl_ord_id: String,
    pub status: OrdStatus,

    /// ExecType (150) when present and recognised.
    pub exec_type: Option<OrdStatus>,
}

/// One execution emitted by the venue simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Status after this execution.
    pub status: OrdStatus,

    /// Quantity executed by this fill.
    pub last_qty: u64,

    /// Total executed so far.
    pub cum_qty: u64,

    /// Quantity still open.
    pub leaves_qty: u64,
}
