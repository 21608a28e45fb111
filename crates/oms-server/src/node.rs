//! A running server role: connection manager + endpoint + listener.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::endpoint::{FixEndpoint, FixEndpointBuilder};
use crate::types::Port;

pub struct Node {
    name: &'static str,
    manager: ConnectionManager,
    endpoint: Arc<FixEndpoint>,
    local_addr: SocketAddr,
}

impl Node {
    /// Start the endpoint, connect to every peer, then listen on `port`.
    ///
    /// Peers are connected before the listener opens, so no client traffic
    /// arrives before the downstream sessions exist. On failure everything
    /// started so far is torn down.
    pub async fn launch(
        name: &'static str,
        config: &Config,
        port: Port,
        peers: &[(&'static str, Port)],
        builder: FixEndpointBuilder,
    ) -> Result<Node> {
        let manager = ConnectionManager::new(config.clone());
        let endpoint = Arc::new(builder.build(manager.clone()));
        endpoint.start();

        match Node::wire(config, &manager, port, peers).await {
            Ok(local_addr) => {
                info!(node = name, %local_addr, "node started");
                Ok(Node {
                    name,
                    manager,
                    endpoint,
                    local_addr,
                })
            }
            Err(e) => {
                manager.stop();
                manager.wait().await;
                Err(e.context(format!("starting {name}")))
            }
        }
    }

    async fn wire(
        config: &Config,
        manager: &ConnectionManager,
        port: Port,
        peers: &[(&'static str, Port)],
    ) -> Result<SocketAddr> {
        for (peer, peer_port) in peers {
            manager
                .connect_with_retry(*peer_port, config.connect_attempts, config.connect_retry_delay())
                .await
                .with_context(|| format!("connecting to {peer} on port {peer_port}"))?;
        }

        manager
            .listen(port)
            .await
            .with_context(|| format!("listening on port {port}"))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> Port {
        self.local_addr.port()
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn endpoint(&self) -> &Arc<FixEndpoint> {
        &self.endpoint
    }

    pub fn shutdown(&self) {
        self.manager.stop();
    }

    /// Resolves once the node has been stopped and fully torn down.
    pub async fn wait(&self) {
        self.manager.wait().await;
        info!(node = self.name, "node stopped");
    }
}
