//! Order-entry client.
//!
//! Connects to a node, submits new orders (or status requests) and
//! collects the execution reports that come back.

use std::sync::Arc;
use std::time::Duration;

use oms_core::NewOrder;
use oms_protocol::orders;
use oms_protocol::tags::{self, msg_type};
use oms_protocol::WireMessage;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::endpoint::{FixEndpoint, FixEndpointBuilder};
use crate::error::TransportError;
use crate::types::{Port, SessionId};

pub struct OrderClient {
    manager: ConnectionManager,
    endpoint: Arc<FixEndpoint>,
    session: SessionId,
    reports: mpsc::UnboundedReceiver<WireMessage>,
}

impl OrderClient {
    pub async fn connect(config: &Config, port: Port) -> Result<Self, TransportError> {
        let (reports_tx, reports) = mpsc::unbounded_channel();

        let mut builder = FixEndpointBuilder::new(config.endpoint_settings());
        builder.register_handler(msg_type::EXECUTION_REPORT, move |_, message, _| {
            let _ = reports_tx.send(message);
        });

        let manager = ConnectionManager::new(config.clone());
        let endpoint = Arc::new(builder.build(manager.clone()));
        endpoint.start();

        match manager.connect(port).await {
            Ok(session) => Ok(OrderClient {
                manager,
                endpoint,
                session,
                reports,
            }),
            Err(e) => {
                manager.stop();
                manager.wait().await;
                Err(e)
            }
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Send a new order; `false` if the connection is gone.
    pub fn submit(&self, order: &NewOrder) -> bool {
        self.endpoint
            .send_typed(orders::new_order_message(order), self.session)
    }

    /// Ask for the stored status of an order (record store only).
    pub fn request_status(&self, cl_ord_id: &str) -> bool {
        let request =
            WireMessage::of_type(msg_type::ORDER_STATUS_REQUEST).with(tags::CL_ORD_ID, cl_ord_id);
        self.endpoint.send_typed(request, self.session)
    }

    /// Next execution report, or `None` after `timeout`.
    pub async fn next_report(&mut self, timeout: Duration) -> Option<WireMessage> {
        tokio::time::timeout(timeout, self.reports.recv())
            .await
            .ok()
            .flatten()
    }

    /// Close the connection and wait for its tasks.
    pub async fn close(self) {
        self.manager.stop();
        self.manager.wait().await;
    }
}
