//! Process-wide `tracing` subscriber.

use std::env;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, writing to stderr.
///
/// The filter comes from `OMS_LOG`, then `RUST_LOG`, then `default`.
/// Calling this more than once is harmless.
pub fn init(default: &str) {
    let filter = env::var("OMS_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
