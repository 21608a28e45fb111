//! Order routing table.
//!
//! Correlates each in-flight client order with the session that sent it,
//! so venue responses can be routed back to the right client:
//! - a client new-order creates an entry (`PendingNew`),
//! - a venue partial fill moves it to `Working` and keeps it,
//! - a fill / rejection / cancellation is terminal and erases it.
//!
//! The table is generic over the session handle so it stays free of any
//! networking types.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::RoutingError;
use crate::order_status::OrdStatus;

/// Where an order is in its routed lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouteState {
    /// Forwarded to the venue, no execution yet.
    PendingNew,

    /// Partially filled; more executions expected.
    Working,

    /// Terminal. Entries in this state are no longer in the table.
    Done,
}

/// A routing entry: the originating session and the order's state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Route<S> {
    pub origin: S,
    pub state: RouteState,
}

/// ClOrdID -> originating session.
///
/// Lookups take the shared lock, mutations the exclusive one.
#[derive(Debug)]
pub struct RoutingTable<S> {
    routes: RwLock<HashMap<String, Route<S>>>,
}

impl<S> Default for RoutingTable<S> {
    fn default() -> Self {
        RoutingTable {
            routes: RwLock::new(HashMap::new()),
        }
    }
}

impl<S: Copy> RoutingTable<S> {
    /// Create an empty routing table.
    pub fn new() -> Self {
        RoutingTable::default()
    }

    /// Record that `origin` submitted `cl_ord_id`.
    ///
    /// An identifier that is already routed is rejected and the existing
    /// entry is left untouched.
    pub fn register(&self, cl_ord_id: &str, origin: S) -> Result<(), RoutingError> {
        let mut routes = self.routes.write();
        if routes.contains_key(cl_ord_id) {
            return Err(RoutingError::DuplicateOrder(cl_ord_id.to_string()));
        }

        routes.insert(
            cl_ord_id.to_string(),
            Route {
                origin,
                state: RouteState::PendingNew,
            },
        );
        Ok(())
    }

    /// Apply a venue status to an order and return the route it resolved
    /// to.
    ///
    /// Terminal statuses erase the entry; the returned route then carries
    /// `RouteState::Done`.
    pub fn apply(&self, cl_ord_id: &str, status: OrdStatus) -> Result<Route<S>, RoutingError> {
        let mut routes = self.routes.write();

        if status.is_terminal() {
            return routes
                .remove(cl_ord_id)
                .map(|route| Route {
                    origin: route.origin,
                    state: RouteState::Done,
                })
                .ok_or_else(|| RoutingError::UnknownOrder(cl_ord_id.to_string()));
        }

        let route = routes
            .get_mut(cl_ord_id)
            .ok_or_else(|| RoutingError::UnknownOrder(cl_ord_id.to_string()))?;

        if status == OrdStatus::PartialFill {
            route.state = RouteState::Working;
        }

        Ok(*route)
    }

    /// Session that submitted `cl_ord_id`, if it is still routed.
    pub fn origin(&self, cl_ord_id: &str) -> Option<S> {
        self.routes.read().get(cl_ord_id).map(|route| route.origin)
    }

    /// Current state of a routed order.
    pub fn state(&self, cl_ord_id: &str) -> Option<RouteState> {
        self.routes.read().get(cl_ord_id).map(|route| route.state)
    }

    /// Number of orders currently in flight.
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_fill_keeps_the_route_and_fill_erases_it() {
        let table = RoutingTable::new();
        table.register("A", 7u64).unwrap();
        assert_eq!(table.state("A"), Some(RouteState::PendingNew));

        let route = table.apply("A", OrdStatus::PartialFill).unwrap();
        assert_eq!(route.origin, 7);
        assert_eq!(route.state, RouteState::Working);
        assert_eq!(table.state("A"), Some(RouteState::Working));

        let route = table.apply("A", OrdStatus::Fill).unwrap();
        assert_eq!(route.state, RouteState::Done);
        assert!(table.is_empty());
    }

    #[test]
    fn venue_new_does_not_advance_state() {
        let table = RoutingTable::new();
        table.register("A", 1u64).unwrap();

        let route = table.apply("A", OrdStatus::New).unwrap();
        assert_eq!(route.state, RouteState::PendingNew);
    }
}
