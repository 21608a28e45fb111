//! Error types for the order-management core.
//!
//! None of these are fatal: callers log them and leave state untouched.

use thiserror::Error;

use crate::order_status::OrdStatus;

/// Failures of the routing table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// A new order reused an identifier that is still in flight.
    #[error("duplicate ClOrdID {0}: order is already routed")]
    DuplicateOrder(String),

    /// A venue report named an identifier with no routing entry.
    #[error("no route for ClOrdID {0}")]
    UnknownOrder(String),
}

/// Failures of the record store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A record for this identifier already exists.
    #[error("duplicate ClOrdID {0}: record already exists")]
    DuplicateRecord(String),

    /// An update named an identifier with no record.
    #[error("no order record for ClOrdID {0}")]
    UnknownRecord(String),
}

/// Reasons the venue simulator refuses an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VenueError {
    #[error("invalid order quantity {0:?}")]
    InvalidQuantity(String),
}

impl VenueError {
    /// Status the venue reports back for this refusal.
    pub fn status(&self) -> OrdStatus {
        OrdStatus::Rejected
    }
}
