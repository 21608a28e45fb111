//! Shared types for the connection layer.
//!
//! This module defines:
//! - `SessionId`: a lightweight handle for live connections
//! - `InboundEvent`: what session readers hand to the dispatcher
//! - channel aliases between sessions and the dispatcher
//! - `SessionState`: the session lifecycle

use std::fmt;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};

/// Identifier for a live TCP session.
///
/// Opaque and unique over the lifetime of a connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TCP port number identifying a peer.
pub type Port = u16;

/// Message flowing from a session reader into the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Bytes read from a session, exactly as received.
    Data { session: SessionId, payload: Bytes },

    /// The session is gone; queued after its last `Data`.
    Closed { session: SessionId },
}

/// Channel from sessions -> dispatcher.
pub type InboundTx = mpsc::UnboundedSender<InboundEvent>;
pub type InboundRx = mpsc::UnboundedReceiver<InboundEvent>;

/// Encoded frames waiting to be written to one session.
pub type OutboundTx = mpsc::UnboundedSender<Bytes>;
pub type OutboundRx = mpsc::UnboundedReceiver<Bytes>;

/// Session lifecycle.
///
/// `Connecting -> Active -> Draining -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, reader and writer not yet running.
    Connecting,

    /// Reading and writing.
    Active,

    /// No more reads; queued output is being flushed.
    Draining,

    /// Socket released and removed from every table.
    Closed,
}

/// Resolve once the flag behind `rx` is `true` (or its sender is gone).
pub(crate) async fn signalled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
