//! Order router.
//!
//! Owns the routing table and the per-order state machine:
//! - client new-order (`35=D`): register the route, forward the order to
//!   the venue and the store, acknowledge to the client (and the store)
//!   with a New execution report,
//! - venue execution report (`35=8`): forward to the originating client
//!   and the store; terminal statuses erase the route.
//!
//! All handlers run on the dispatcher task, so orders are processed in
//! receipt order.

use std::sync::Arc;

use anyhow::Result;
use oms_core::{IdGenerator, OrdStatus, RouteState, RoutingTable};
use oms_protocol::orders;
use oms_protocol::tags::msg_type;
use oms_protocol::WireMessage;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::endpoint::{FixEndpoint, FixEndpointBuilder};
use crate::node::Node;
use crate::transport::Transport;
use crate::types::{Port, SessionId};

pub struct OrderRouter {
    routes: RoutingTable<SessionId>,
    venue_port: Port,
    store_port: Port,
    ids: Arc<IdGenerator>,
}

impl OrderRouter {
    pub fn new(venue_port: Port, store_port: Port, ids: Arc<IdGenerator>) -> Self {
        OrderRouter {
            routes: RoutingTable::new(),
            venue_port,
            store_port,
            ids,
        }
    }

    /// Register the router's message handlers and the `routes` command.
    pub fn install<T: Transport>(self: &Arc<Self>, builder: &mut FixEndpointBuilder<T>) {
        let router = Arc::clone(self);
        builder.register_handler(msg_type::NEW_ORDER_SINGLE, move |endpoint, message, session| {
            router.on_new_order(endpoint, message, session)
        });

        let router = Arc::clone(self);
        builder.register_handler(msg_type::EXECUTION_REPORT, move |endpoint, message, session| {
            router.on_execution_report(endpoint, message, session)
        });

        let router = Arc::clone(self);
        builder.register_admin_command("routes", move |endpoint, session| {
            endpoint.reply_admin(session, &format!("{} orders in flight", router.in_flight()));
        });
    }

    pub fn on_new_order<T: Transport>(
        &self,
        endpoint: &FixEndpoint<T>,
        order: WireMessage,
        client: SessionId,
    ) {
        let cl_ord_id = match orders::cl_ord_id(&order) {
            Ok(id) => id.to_string(),
            Err(e) => {
                warn!(session = %client, error = %e, "new order dropped");
                return;
            }
        };

        if let Err(e) = self.routes.register(&cl_ord_id, client) {
            warn!(session = %client, error = %e, "new order dropped");
            return;
        }
        info!(session = %client, %cl_ord_id, "order routed");

        endpoint.send_to_port(self.venue_port, order.clone());
        endpoint.send_to_port(self.store_port, order.clone());

        let ack = orders::execution_report(&order, OrdStatus::New, &self.ids.next_id());
        endpoint.send_typed(ack.clone(), client);
        endpoint.send_to_port(self.store_port, ack);
    }

    pub fn on_execution_report<T: Transport>(
        &self,
        endpoint: &FixEndpoint<T>,
        report: WireMessage,
        from: SessionId,
    ) {
        if endpoint.transport().session_for_port(self.venue_port) != Some(from) {
            warn!(session = %from, "execution report from a non-venue session dropped");
            return;
        }

        let parsed = match orders::parse_execution_report(&report) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(session = %from, error = %e, "execution report dropped");
                return;
            }
        };

        match self.routes.apply(&parsed.cl_ord_id, parsed.status) {
            Ok(route) => {
                endpoint.send_typed(report.clone(), route.origin);
                if route.state == RouteState::Done {
                    info!(cl_ord_id = %parsed.cl_ord_id, status = %parsed.status, "order done");
                } else {
                    debug!(cl_ord_id = %parsed.cl_ord_id, status = %parsed.status, "order updated");
                }
            }
            Err(e) => warn!(error = %e, status = %parsed.status, "report not delivered to a client"),
        }

        endpoint.send_to_port(self.store_port, report);
    }

    /// Orders currently routed.
    pub fn in_flight(&self) -> usize {
        self.routes.len()
    }

    pub fn route_state(&self, cl_ord_id: &str) -> Option<RouteState> {
        self.routes.state(cl_ord_id)
    }

    pub fn origin(&self, cl_ord_id: &str) -> Option<SessionId> {
        self.routes.origin(cl_ord_id)
    }
}

/// A router bound to its listening port and connected to its peers.
pub struct RouterNode {
    node: Node,
    router: Arc<OrderRouter>,
}

impl RouterNode {
    pub async fn start(
        config: &Config,
        port: Port,
        venue_port: Port,
        store_port: Port,
        ids: Arc<IdGenerator>,
    ) -> Result<Self> {
        let router = Arc::new(OrderRouter::new(venue_port, store_port, ids));

        let mut builder = FixEndpointBuilder::new(config.endpoint_settings());
        router.install(&mut builder);

        let peers = [("venue", venue_port), ("store", store_port)];
        let node = Node::launch("router", config, port, &peers, builder).await?;

        Ok(RouterNode { node, router })
    }

    pub fn router(&self) -> &OrderRouter {
        &self.router
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
