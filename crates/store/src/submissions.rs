//! Durable store: an append-only Postgres log of accepted indices.
//!
//! The table is a single INT column; duplicates are allowed and rows are
//! never updated or deleted. Schema creation is idempotent and runs inside
//! the startup readiness check.

use async_trait::async_trait;
use fibflow_core::{PostgresConfig, StartupConfig};
use serde::Serialize;
use thiserror::Error;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Postgres: {0}")]
  Postgres(#[from] tokio_postgres::Error),
  #[error("Index is not an integer: {0:?}")]
  BadIndex(String),
  #[error("Postgres connection failed after {attempts} attempts: {source}")]
  Exhausted {
    attempts: u32,
    source: tokio_postgres::Error,
  },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One accepted submission, as stored in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
  pub number: i32,
}

/// Append-only log of accepted indices
#[async_trait]
pub trait SubmissionStore: Send + Sync {
  /// Append one row. The index arrives in textual form and is parsed
  /// here rather than at admission, so a non-numeric index that slipped
  /// past the gateway's upper-bound check fails at this step.
  async fn append(&self, index: &str) -> Result<()>;

  /// Every stored row, unordered.
  async fn all(&self) -> Result<Vec<Submission>>;
}

/// Postgres-backed submission store
pub struct PgSubmissionStore {
  client: Client,
}

impl PgSubmissionStore {
  pub fn new(client: Client) -> Self {
    Self { client }
  }

  /// Liveness probe plus idempotent table creation.
  ///
  /// "values" is quoted because it is a reserved word in Postgres.
  pub async fn ensure_schema(&self) -> Result<()> {
    self.client.query_one("SELECT 1", &[]).await?;
    self
      .client
      .execute(r#"CREATE TABLE IF NOT EXISTS "values" (number INT)"#, &[])
      .await?;
    Ok(())
  }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
  async fn append(&self, index: &str) -> Result<()> {
    let number: i32 = index
      .trim()
      .parse()
      .map_err(|_| StoreError::BadIndex(index.to_string()))?;

    self
      .client
      .execute(r#"INSERT INTO "values"(number) VALUES($1)"#, &[&number])
      .await?;
    Ok(())
  }

  async fn all(&self) -> Result<Vec<Submission>> {
    let rows = self.client.query(r#"SELECT number FROM "values""#, &[]).await?;
    Ok(rows.iter().map(|row| Submission { number: row.get(0) }).collect())
  }
}

/// Connect to Postgres with a bounded retry loop, then verify the schema.
///
/// Exhausting the retries returns an error; the caller is expected to treat
/// that as fatal rather than serving without the durable store.
pub async fn connect_with_retry(config: &PostgresConfig, startup: &StartupConfig) -> Result<PgSubmissionStore> {
  let retries = startup.store_retries.max(1);
  let delay = std::time::Duration::from_millis(startup.store_retry_delay_ms);

  let mut attempt = 1;
  loop {
    match try_connect(config).await {
      Ok(store) => {
        info!("Connected to Postgres at {}:{}", config.host, config.port);
        return Ok(store);
      }
      Err(StoreError::Postgres(source)) if attempt < retries => {
        warn!("Postgres connection attempt {attempt}/{retries} failed: {source}");
        attempt += 1;
        tokio::time::sleep(delay).await;
      }
      Err(StoreError::Postgres(source)) => {
        return Err(StoreError::Exhausted {
          attempts: retries,
          source,
        });
      }
      Err(e) => return Err(e),
    }
  }
}

async fn try_connect(config: &PostgresConfig) -> Result<PgSubmissionStore> {
  let (client, connection) = tokio_postgres::Config::new()
    .host(&config.host)
    .port(config.port)
    .user(&config.user)
    .password(&config.password)
    .dbname(&config.dbname)
    .connect(NoTls)
    .await?;

  // The connection future drives the socket; it resolves when the
  // connection closes.
  tokio::spawn(async move {
    if let Err(e) = connection.await {
      error!("Postgres connection error: {e}");
    }
  });

  let store = PgSubmissionStore::new(client);
  store.ensure_schema().await?;
  Ok(store)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_submission_serializes_as_number_object() {
    let row = Submission { number: 5 };
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json, serde_json::json!({"number": 5}));
  }

  #[test]
  fn test_bad_index_error_names_the_input() {
    let err = StoreError::BadIndex("banana".to_string());
    assert!(err.to_string().contains("banana"));
  }
}
