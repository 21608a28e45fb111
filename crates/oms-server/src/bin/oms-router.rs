//! Order router process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use oms_core::IdGenerator;
use oms_server::config::{Config, DEFAULT_ROUTER_PORT, DEFAULT_STORE_PORT, DEFAULT_VENUE_PORT};
use oms_server::logging;
use oms_server::router::RouterNode;
use tracing::info;

#[derive(Parser)]
#[clap(name = "oms-router")]
#[clap(about = "Routes client orders to the venue and records them in the store")]
struct Cli {
    /// Port clients connect to
    #[clap(short, long, default_value_t = DEFAULT_ROUTER_PORT)]
    port: u16,

    /// Venue port
    #[clap(long, default_value_t = DEFAULT_VENUE_PORT)]
    venue_port: u16,

    /// Record store port
    #[clap(long, default_value_t = DEFAULT_STORE_PORT)]
    store_port: u16,

    /// Optional TOML config file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Seed for reproducible execution ids
    #[clap(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init("info");

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let ids = Arc::new(cli.seed.map_or_else(IdGenerator::new, IdGenerator::seeded));

    let node = RouterNode::start(&config, cli.port, cli.venue_port, cli.store_port, ids).await?;
    info!(port = node.port(), "oms-router ready");

    let manager = node.node().manager().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            manager.stop();
        }
    });

    node.wait().await;
    interrupt.abort();
    Ok(())
}
