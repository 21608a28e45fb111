//! oms-server
//!
//! Async TCP plumbing and the network roles of the order-management system.
//!
//! - [`connection`] : listening / outbound sessions, one reader and one
//!   writer task per session, a single dispatcher task
//! - [`endpoint`]   : framing, decoding, message-type and admin dispatch
//! - [`router`], [`venue`], [`store`] : the three server roles
//! - [`client`], [`admin`] : order-entry and operator clients

pub mod config;
pub mod logging;
pub mod types;
pub mod error;
pub mod ports;
pub mod transport;
pub mod connection;
pub mod endpoint;
pub mod node;
pub mod router;
pub mod venue;
pub mod store;
pub mod client;
pub mod admin;

pub use config::{Config, ReadErrorPolicy};
pub use connection::ConnectionManager;
pub use endpoint::{EndpointSettings, FixEndpoint, FixEndpointBuilder};
pub use error::TransportError;
pub use transport::{ByteHandler, Transport};
pub use types::{Port, SessionId, SessionState};
