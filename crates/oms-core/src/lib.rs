//! oms-core
//!
//! Pure order-management logic:
//! - order side / status vocabulary
//! - logical order and execution messages
//! - routing table correlating orders with their originating session
//! - in-memory order record store
//! - venue fill simulation
//! - id generation
//!
//! Nothing in here knows about sockets or the wire format; the
//! `oms-protocol` crate converts wire messages into these types and the
//! `oms-server` crate wires everything to the network.

pub mod side;
pub mod order_status;
pub mod messages;
pub mod routing;
pub mod record_store;
pub mod venue;
pub mod ids;
pub mod error;

pub use side::Side;
pub use order_status::OrdStatus;

pub use messages::{ExecutionReport, Fill, NewOrder};

pub use routing::{Route, RouteState, RoutingTable};
pub use record_store::{OrderRecord, RecordStore};
pub use venue::simulate_fills;
pub use ids::IdGenerator;
pub use error::{RoutingError, StoreError, VenueError};
