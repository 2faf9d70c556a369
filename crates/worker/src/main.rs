//! fibflow worker: subscribes to the insert channel and computes results.

use anyhow::Result;
use cache::{RedisValueCache, Subscription, ValueCache};
use fibflow_core::{Config, NaiveRecursive};
use futures::StreamExt;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
    .init();

  let config = Config::load();

  // Bounded-retry readiness check; exhaustion aborts startup.
  let client = cache::open_client(&config.redis)?;
  let conn = cache::connect_with_retry(&client, &config.startup).await?;
  let values: Arc<dyn ValueCache> = Arc::new(RedisValueCache::new(conn));

  // The subscription holds its own connection for the process lifetime.
  let subscription = Subscription::subscribe(&client).await?;
  let messages = subscription.into_stream().boxed();

  info!("Worker listening for fibonacci calculations...");

  tokio::select! {
    () = worker::run(messages, values, Arc::new(NaiveRecursive)) => {}
    result = tokio::signal::ctrl_c() => {
      if let Err(e) = result {
        tracing::warn!("Failed to listen for ctrl-c: {e}");
      }
      info!("Received ctrl-c, shutting down...");
    }
  }

  Ok(())
}
