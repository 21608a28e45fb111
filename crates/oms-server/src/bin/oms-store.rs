//! Record store process.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use oms_server::config::{Config, DEFAULT_STORE_PORT};
use oms_server::logging;
use oms_server::store::StoreNode;
use tracing::info;

#[derive(Parser)]
#[clap(name = "oms-store")]
#[clap(about = "In-memory order record store")]
struct Cli {
    #[clap(short, long, default_value_t = DEFAULT_STORE_PORT)]
    port: u16,

    /// Optional TOML config file
    #[clap(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init("info");

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let node = StoreNode::start(&config, cli.port).await?;
    info!(port = node.port(), "oms-store ready");

    let manager = node.node().manager().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            manager.stop();
        }
    });

    node.wait().await;
    interrupt.abort();

    info!(records = node.records().len(), "oms-store exiting");
    Ok(())
}
