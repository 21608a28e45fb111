//! Venue simulator process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use oms_core::IdGenerator;
use oms_server::config::{Config, DEFAULT_VENUE_PORT};
use oms_server::logging;
use oms_server::venue::VenueNode;
use tracing::info;

#[derive(Parser)]
#[clap(name = "oms-venue")]
#[clap(about = "Simulated venue: fills every order in two executions")]
struct Cli {
    #[clap(short, long, default_value_t = DEFAULT_VENUE_PORT)]
    port: u16,

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

    let node = VenueNode::start(&config, cli.port, ids).await?;
    info!(port = node.port(), "oms-venue ready");

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
