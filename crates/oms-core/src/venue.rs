//! Venue fill simulation.
//!
//! The simulated venue has no book and no matching logic: every accepted
//! order is answered with a partial fill for half the quantity followed by
//! a fill for the remainder. That drives the router's two-report sequence
//! deterministically.

use crate::error::VenueError;
use crate::messages::{Fill, NewOrder};
use crate::order_status::OrdStatus;

/// Produce the partial-fill / fill pair for an order.
///
/// The quantity must be a positive integer; anything else is refused and
/// the venue answers with a rejection instead.
pub fn simulate_fills(order: &NewOrder) -> Result<[Fill; 2], VenueError> {
    let quantity = order
        .quantity
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|qty| *qty > 0)
        .ok_or_else(|| VenueError::InvalidQuantity(order.quantity.clone()))?;

    let partial = quantity / 2;
    let remainder = quantity - partial;

    Ok([
        Fill {
            status: OrdStatus::PartialFill,
            last_qty: partial,
            cum_qty: partial,
            leaves_qty: remainder,
        },
        Fill {
            status: OrdStatus::Fill,
            last_qty: remainder,
            cum_qty: quantity,
            leaves_qty: 0,
        },
    ])
}
