//! The seams between the connection layer and the protocol layer.
//!
//! - [`Transport`]: what the protocol endpoint needs from the network.
//! - [`ByteHandler`]: what the connection layer calls with inbound bytes.
//!
//! `ConnectionManager` implements `Transport`; `FixEndpoint` implements
//! `ByteHandler` and is generic over any `Transport`, which lets the
//! endpoint and every node run against an in-memory transport in tests.

use bytes::Bytes;

use crate::types::{Port, SessionId};

pub trait Transport: Send + Sync + 'static {
    /// Queue an encoded frame for `session`.
    ///
    /// Returns `false` (and drops the frame) if the session is unknown or
    /// not active.
    fn send(&self, payload: Bytes, session: SessionId) -> bool;

    /// Current session for a peer port.
    fn session_for_port(&self, port: Port) -> Option<SessionId>;

    /// Begin shutting the transport down.
    fn stop(&self);
}

/// Receives inbound bytes; called from the single dispatcher task.
pub trait ByteHandler: Send + Sync + 'static {
    fn on_receive(&self, payload: Bytes, session: SessionId);

    /// The session is gone; no more bytes will arrive for it.
    fn on_session_closed(&self, _session: SessionId) {}
}
