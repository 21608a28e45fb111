//! Transport-level errors.

use std::io;

use thiserror::Error;

use crate::types::Port;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: Port,
        #[source]
        source: io::Error,
    },

    #[error("connection manager has been stopped")]
    Stopped,
}
