//! Fast-path cache: a single Redis hash mapping index -> value.
//!
//! A field starts as the placeholder sentinel at submission time and is
//! overwritten once with the computed result. Fields are never deleted, so
//! a field stuck at the placeholder means no worker saw the notification.

use async_trait::async_trait;
use fibflow_core::{RedisConfig, StartupConfig};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

/// Redis hash holding every current value
pub const VALUES_KEY: &str = "values";

/// Sentinel written at submission time, before any result exists
pub const PLACEHOLDER: &str = "Nothing yet!";

#[derive(Error, Debug)]
pub enum CacheError {
  #[error("Redis: {0}")]
  Redis(#[from] redis::RedisError),
  #[error("Redis connection failed after {attempts} attempts: {source}")]
  Exhausted { attempts: u32, source: redis::RedisError },
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Key-value view of the fast-path cache
#[async_trait]
pub trait ValueCache: Send + Sync {
  /// Set one field of the values hash. Last write wins; there is no
  /// compare-and-set, so concurrent writers for the same index race.
  async fn set(&self, index: &str, value: &str) -> Result<()>;

  /// Snapshot of the whole hash.
  async fn all(&self) -> Result<HashMap<String, String>>;
}

/// Redis-backed value cache over a multiplexed connection
pub struct RedisValueCache {
  conn: ConnectionManager,
}

impl RedisValueCache {
  pub fn new(conn: ConnectionManager) -> Self {
    Self { conn }
  }
}

#[async_trait]
impl ValueCache for RedisValueCache {
  async fn set(&self, index: &str, value: &str) -> Result<()> {
    let mut conn = self.conn.clone();
    conn.hset::<_, _, _, ()>(VALUES_KEY, index, value).await?;
    Ok(())
  }

  async fn all(&self) -> Result<HashMap<String, String>> {
    let mut conn = self.conn.clone();
    Ok(conn.hgetall(VALUES_KEY).await?)
  }
}

/// Build a Redis client for the configured endpoint.
///
/// The client itself holds no connection; commands go through a
/// [`ConnectionManager`] and pub/sub through a dedicated connection.
pub fn open_client(config: &RedisConfig) -> Result<redis::Client> {
  Ok(redis::Client::open(redis_url(config))?)
}

fn redis_url(config: &RedisConfig) -> String {
  format!("redis://{}:{}/", config.host, config.port)
}

/// Establish a command connection with a bounded retry loop, verified
/// with a PING per attempt. Exhaustion is an error the caller should
/// treat as fatal.
pub async fn connect_with_retry(client: &redis::Client, startup: &StartupConfig) -> Result<ConnectionManager> {
  let retries = startup.cache_retries.max(1);
  let delay = std::time::Duration::from_millis(startup.cache_retry_delay_ms);

  let mut attempt = 1;
  loop {
    match try_connect(client).await {
      Ok(conn) => {
        info!("Connected to Redis");
        return Ok(conn);
      }
      Err(source) if attempt < retries => {
        warn!("Redis connection attempt {attempt}/{retries} failed: {source}");
        attempt += 1;
        tokio::time::sleep(delay).await;
      }
      Err(source) => {
        return Err(CacheError::Exhausted {
          attempts: retries,
          source,
        });
      }
    }
  }
}

async fn try_connect(client: &redis::Client) -> redis::RedisResult<ConnectionManager> {
  let mut conn = ConnectionManager::new(client.clone()).await?;
  redis::cmd("PING").query_async::<String>(&mut conn).await?;
  Ok(conn)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_redis_url() {
    let config = RedisConfig {
      host: "cache.internal".to_string(),
      port: 6380,
    };
    assert_eq!(redis_url(&config), "redis://cache.internal:6380/");
  }

  #[test]
  fn test_sentinels() {
    assert_eq!(VALUES_KEY, "values");
    assert_eq!(PLACEHOLDER, "Nothing yet!");
  }
}
