//! Order record store node (the persistence tier).
//!
//! - `35=D`: create a record (duplicates are logged and ignored),
//! - `35=8`: update a record (unknown orders are logged and ignored),
//! - `35=H`: reply with the record's current status,
//! - admin `records`: number of records held.

use std::sync::Arc;

use anyhow::Result;
use oms_core::RecordStore;
use oms_protocol::orders;
use oms_protocol::tags::msg_type;
use oms_protocol::WireMessage;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::endpoint::{FixEndpoint, FixEndpointBuilder};
use crate::node::Node;
use crate::transport::Transport;
use crate::types::{Port, SessionId};

#[derive(Debug, Default)]
pub struct OrderStore {
    records: RecordStore,
}

impl OrderStore {
    pub fn new() -> Self {
        OrderStore::default()
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn install<T: Transport>(self: &Arc<Self>, builder: &mut FixEndpointBuilder<T>) {
        let store = Arc::clone(self);
        builder.register_handler(msg_type::NEW_ORDER_SINGLE, move |_, message, session| {
            store.on_new_order(&message, session)
        });

        let store = Arc::clone(self);
        builder.register_handler(msg_type::EXECUTION_REPORT, move |_, message, session| {
            store.on_execution_report(&message, session)
        });

        let store = Arc::clone(self);
        builder.register_handler(msg_type::ORDER_STATUS_REQUEST, move |endpoint, message, session| {
            store.on_status_request(endpoint, &message, session)
        });

        let store = Arc::clone(self);
        builder.register_admin_command("records", move |endpoint, session| {
            endpoint.reply_admin(session, &format!("{} records", store.records.len()));
        });
    }

    pub fn on_new_order(&self, message: &WireMessage, session: SessionId) {
        let order = match orders::parse_new_order(message) {
            Ok(order) => order,
            Err(e) => {
                warn!(%session, error = %e, "new order dropped");
                return;
            }
        };

        match self.records.create(&order) {
            Ok(()) => info!(cl_ord_id = %order.cl_ord_id, "record created"),
            Err(e) => warn!(%session, error = %e, "record not created"),
        }
    }

    pub fn on_execution_report(&self, message: &WireMessage, session: SessionId) {
        let report = match orders::parse_execution_report(message) {
            Ok(report) => report,
            Err(e) => {
                warn!(%session, error = %e, "execution report dropped");
                return;
            }
        };

        match self.records.update(&report) {
            Ok(previous) => debug!(
                cl_ord_id = %report.cl_ord_id,
                from = %previous,
                to = %report.status,
                "record updated"
            ),
            Err(e) => warn!(%session, error = %e, "record not updated"),
        }
    }

    pub fn on_status_request<T: Transport>(
        &self,
        endpoint: &FixEndpoint<T>,
        message: &WireMessage,
        session: SessionId,
    ) {
        let cl_ord_id = match orders::cl_ord_id(message) {
            Ok(id) => id,
            Err(e) => {
                warn!(%session, error = %e, "status request dropped");
                return;
            }
        };

        let reply = match self.records.get(cl_ord_id) {
            Some(record) => orders::order_status_reply(&record),
            None => orders::unknown_order_reply(cl_ord_id),
        };
        endpoint.send_typed(reply, session);
    }
}

pub struct StoreNode {
    node: Node,
    store: Arc<OrderStore>,
}

impl StoreNode {
    pub async fn start(config: &Config, port: Port) -> Result<Self> {
        let store = Arc::new(OrderStore::new());

        let mut builder = FixEndpointBuilder::new(config.endpoint_settings());
        store.install(&mut builder);

        let node = Node::launch("store", config, port, &[], builder).await?;
        Ok(StoreNode { node, store })
    }

    pub fn records(&self) -> &RecordStore {
        self.store.records()
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn port(&self) -> Port {
        self.node.port()
    }

    pub fn shutdown(&self) {
        self.node.shutdown();
    }

    pub async fn wait(&self) {
        self.node.wait().await;
    }
}
