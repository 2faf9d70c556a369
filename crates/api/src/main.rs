//! fibflow API server: accepts index submissions and serves value snapshots.

use anyhow::Result;
use api::{AppState, ReadGateway, SubmissionGateway, router};
use cache::{Notifier, RedisNotifier, RedisValueCache, ValueCache};
use fibflow_core::Config;
use std::sync::Arc;
use store::SubmissionStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
    .init();

  let config = Config::load();

  // Startup readiness: bounded retries, then fatal. Serving without a
  // backend is not an option.
  let pg = store::connect_with_retry(&config.postgres, &config.startup).await?;
  let submissions: Arc<dyn SubmissionStore> = Arc::new(pg);

  let client = cache::open_client(&config.redis)?;
  let conn = cache::connect_with_retry(&client, &config.startup).await?;
  let values: Arc<dyn ValueCache> = Arc::new(RedisValueCache::new(conn));

  // Publishing gets its own connection, separate from hash commands.
  let notifier: Arc<dyn Notifier> = Arc::new(RedisNotifier::connect(&client).await?);

  let state = AppState {
    submissions: Arc::new(SubmissionGateway::new(
      Arc::clone(&values),
      notifier,
      Arc::clone(&submissions),
    )),
    reads: Arc::new(ReadGateway::new(values, submissions)),
  };

  let addr = format!("{}:{}", config.api.host, config.api.port);
  let listener = tokio::net::TcpListener::bind(&addr).await?;
  info!("API listening on {addr}");

  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("API shutdown complete");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("Failed to listen for ctrl-c: {e}");
    return;
  }
  info!("Received ctrl-c, shutting down...");
}
