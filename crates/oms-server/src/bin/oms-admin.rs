//! Send one admin command to a node and print the response.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use oms_server::admin::AdminClient;
use oms_server::config::Config;
use oms_server::logging;

#[derive(Parser)]
#[clap(name = "oms-admin")]
#[clap(about = "Operator console for router, venue and store nodes")]
struct Cli {
    /// Port of the node to talk to
    port: u16,

    /// Command to run (`list` shows what the node supports)
    #[clap(default_value = "list")]
    command: String,

    /// How long to wait for the response
    #[clap(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Optional TOML config file
    #[clap(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init("warn");

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let mut admin = AdminClient::connect(&config, cli.port)
        .await
        .with_context(|| format!("connecting to port {}", cli.port))?;

    let response = admin
        .send_command(&cli.command, Duration::from_millis(cli.timeout_ms))
        .await;
    admin.close().await;

    println!("{}", response.with_context(|| format!("running {:?}", cli.command))?);
    Ok(())
}
