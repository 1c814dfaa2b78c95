//! Bridge broker server binary
//!
//! Runs the persistent broker other processes route through: callers
//! enqueue over HTTP, the sandboxed host drains by polling the same
//! address.

use bridgeq::{BridgeConfig, BridgeServer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialize logging
  tracing_subscriber::registry()
    .with(fmt::layer())
    .with(EnvFilter::from_default_env().add_directive("bridgeq=info".parse()?))
    .init();

  let config = BridgeConfig::from_env()?;
  info!(
    "starting bridge broker on {}:{} (timeout {:?}, queue cap {}, in-flight cap {})",
    config.host, config.port, config.default_timeout, config.max_queue, config.max_pending
  );
  info!("host processes connect by polling GET /poll on this address");
  info!("other processes route their calls through this broker automatically");

  let server = BridgeServer::new(config);
  server.run().await?;

  Ok(())
}
