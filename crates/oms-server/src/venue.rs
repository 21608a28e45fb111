//! Venue simulator.
//!
//! Stateless: every new order is answered on the session it came from
//! with a partial fill and then a fill, or with a single rejection when
//! its quantity is unusable.

use std::sync::Arc;

use anyhow::Result;
use oms_core::{simulate_fills, IdGenerator};
use oms_protocol::orders;
use oms_protocol::tags::msg_type;
use oms_protocol::WireMessage;
use tracing::{info, warn};

use crate::config::Config;
use crate::endpoint::{FixEndpoint, FixEndpointBuilder};
use crate::node::Node;
use crate::transport::Transport;
use crate::types::{Port, SessionId};

pub struct Venue {
    ids: Arc<IdGenerator>,
}

impl Venue {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Venue { ids }
    }

    pub fn install<T: Transport>(self: &Arc<Self>, builder: &mut FixEndpointBuilder<T>) {
        let venue = Arc::clone(self);
        builder.register_handler(msg_type::NEW_ORDER_SINGLE, move |endpoint, message, session| {
            venue.on_new_order(endpoint, message, session)
        });
    }

    pub fn on_new_order<T: Transport>(
        &self,
        endpoint: &FixEndpoint<T>,
        message: WireMessage,
        session: SessionId,
    ) {
        let order = match orders::parse_new_order(&message) {
            Ok(order) => order,
            Err(e) => {
                warn!(%session, error = %e, "new order dropped");
                return;
            }
        };

        match simulate_fills(&order) {
            Ok(fills) => {
                for fill in &fills {
                    let report = orders::fill_report(&message, fill, &self.ids.next_id());
                    endpoint.send_typed(report, session);
                }
                info!(cl_ord_id = %order.cl_ord_id, quantity = %order.quantity, "order filled");
            }
            Err(e) => {
                warn!(cl_ord_id = %order.cl_ord_id, error = %e, "order rejected");
                let report = orders::reject_report(&message, &e.to_string(), &self.ids.next_id());
                endpoint.send_typed(report, session);
            }
        }
    }
}

pub struct VenueNode {
    node: Node,
}

impl VenueNode {
    pub async fn start(config: &Config, port: Port, ids: Arc<IdGenerator>) -> Result<Self> {
        let venue = Arc::new(Venue::new(ids));

        let mut builder = FixEndpointBuilder::new(config.endpoint_settings());
        venue.install(&mut builder);

        let node = Node::launch("venue", config, port, &[], builder).await?;
        Ok(VenueNode { node })
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
