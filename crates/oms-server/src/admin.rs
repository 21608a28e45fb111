//! Operator client for the admin sub-protocol.
//!
//! Sends `35=QR;10001=<command>` and waits for the matching
//! `35=QR;10002=<text>` response.

use std::sync::Arc;
use std::time::Duration;

use oms_protocol::tags::{self, msg_type};
use oms_protocol::WireMessage;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::endpoint::{FixEndpoint, FixEndpointBuilder};
use crate::error::TransportError;
use crate::types::{Port, SessionId};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("command could not be sent: connection closed")]
    NotSent,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("connection closed before a response arrived")]
    Disconnected,
}

pub struct AdminClient {
    manager: ConnectionManager,
    endpoint: Arc<FixEndpoint>,
    session: SessionId,
    responses: mpsc::UnboundedReceiver<String>,
}

impl AdminClient {
    pub async fn connect(config: &Config, port: Port) -> Result<Self, AdminError> {
        let (responses_tx, responses) = mpsc::unbounded_channel();

        let mut builder = FixEndpointBuilder::new(config.endpoint_settings());
        builder.register_handler(msg_type::ADMIN, move |_, message, _| {
            if let Some(text) = message.get(tags::ADMIN_RESPONSE) {
                let _ = responses_tx.send(text.to_string());
            }
        });

        let manager = ConnectionManager::new(config.clone());
        let endpoint = Arc::new(builder.build(manager.clone()));
        endpoint.start();

        match manager.connect(port).await {
            Ok(session) => Ok(AdminClient {
                manager,
                endpoint,
                session,
                responses,
            }),
            Err(e) => {
                manager.stop();
                manager.wait().await;
                Err(e.into())
            }
        }
    }

    /// Send `command` and wait up to `timeout` for its response.
    pub async fn send_command(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, AdminError> {
        let request = WireMessage::of_type(msg_type::ADMIN).with(tags::ADMIN_COMMAND, command);
        if !self.endpoint.send_typed(request, self.session) {
            return Err(AdminError::NotSent);
        }
        debug!(command, "admin command sent");

        match tokio::time::timeout(timeout, self.responses.recv()).await {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Err(AdminError::Disconnected),
            Err(_) => Err(AdminError::Timeout(timeout)),
        }
    }

    pub async fn close(self) {
        self.manager.stop();
        self.manager.wait().await;
    }
}
