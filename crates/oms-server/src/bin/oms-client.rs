//! Order-entry client: submits generated orders and prints the reports.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use oms_core::{IdGenerator, NewOrder, Side};
use oms_protocol::orders;
use oms_server::client::OrderClient;
use oms_server::config::{Config, DEFAULT_ROUTER_PORT};
use oms_server::logging;
use tracing::warn;

#[derive(Parser)]
#[clap(name = "oms-client")]
#[clap(about = "Submit orders to the router and print execution reports")]
struct Cli {
    /// Router port
    #[clap(short, long, default_value_t = DEFAULT_ROUTER_PORT)]
    port: u16,

    /// Number of orders to submit
    #[clap(short = 'n', long, default_value_t = 1)]
    orders: usize,

    #[clap(short, long, default_value_t = 100)]
    quantity: u64,

    #[clap(long, default_value = "100.00")]
    price: String,

    #[clap(long, default_value = "GBP")]
    currency: String,

    /// Sell instead of buy
    #[clap(long)]
    sell: bool,

    /// Give up after this long without a report
    #[clap(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Optional TOML config file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Seed for reproducible order ids
    #[clap(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init("info");

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let ids = cli.seed.map_or_else(IdGenerator::new, IdGenerator::seeded);
    let side = if cli.sell { Side::Sell } else { Side::Buy };

    let mut client = OrderClient::connect(&config, cli.port)
        .await
        .with_context(|| format!("connecting to router on port {}", cli.port))?;

    let mut open = HashSet::new();
    for _ in 0..cli.orders {
        let order = NewOrder::new(
            ids.next_id(),
            side,
            cli.quantity,
            cli.price.as_str(),
            cli.currency.as_str(),
        );
        if client.submit(&order) {
            println!("sent     {}", order.cl_ord_id);
            open.insert(order.cl_ord_id);
        }
    }

    let timeout = Duration::from_millis(cli.timeout_ms);
    while !open.is_empty() {
        let Some(report) = client.next_report(timeout).await else {
            warn!(open = open.len(), "timed out waiting for execution reports");
            break;
        };

        match orders::parse_execution_report(&report) {
            Ok(parsed) => {
                println!("report   {} {}", parsed.cl_ord_id, parsed.status);
                if parsed.status.is_terminal() {
                    open.remove(&parsed.cl_ord_id);
                }
            }
            Err(e) => warn!(error = %e, "unreadable execution report"),
        }
    }

    client.close().await;
    Ok(())
}
