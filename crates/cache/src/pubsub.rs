//! Notification channel: one fixed Redis pub/sub topic.
//!
//! Plain pub/sub semantics apply: no persistence, no replay, at-most-once
//! delivery per subscriber that is connected at publish time. A message
//! published while no worker is subscribed is gone.

use crate::values::Result;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use redis::aio::ConnectionManager;
use tracing::warn;

/// The single topic carrying newly accepted indices
pub const INSERT_CHANNEL: &str = "insert";

/// Publish half of the notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
  /// Publish the raw textual index.
  async fn publish(&self, index: &str) -> Result<()>;
}

/// Publisher over its own connection, independent of the hash-command
/// connection (the cache and the channel share a Redis server, not a
/// socket).
pub struct RedisNotifier {
  conn: ConnectionManager,
}

impl RedisNotifier {
  pub async fn connect(client: &redis::Client) -> Result<Self> {
    let conn = ConnectionManager::new(client.clone()).await?;
    Ok(Self { conn })
  }
}

#[async_trait]
impl Notifier for RedisNotifier {
  async fn publish(&self, index: &str) -> Result<()> {
    let mut conn = self.conn.clone();
    redis::cmd("PUBLISH")
      .arg(INSERT_CHANNEL)
      .arg(index)
      .query_async::<()>(&mut conn)
      .await?;
    Ok(())
  }
}

/// Subscribe half: a process-lifetime subscription to the insert topic
pub struct Subscription {
  pubsub: redis::aio::PubSub,
}

impl Subscription {
  pub async fn subscribe(client: &redis::Client) -> Result<Self> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(INSERT_CHANNEL).await?;
    Ok(Self { pubsub })
  }

  /// Turn the subscription into a stream of raw payloads. Messages whose
  /// payload is not text are dropped with a warning rather than ending
  /// the stream.
  pub fn into_stream(self) -> impl Stream<Item = String> {
    self.pubsub.into_on_message().filter_map(|msg| async move {
      match msg.get_payload::<String>() {
        Ok(payload) => Some(payload),
        Err(e) => {
          warn!("Dropping notification with non-text payload: {e}");
          None
        }
      }
    })
  }
}
