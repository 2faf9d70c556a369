//! The two halves of the HTTP surface, behind injected client handles.
//!
//! The submission gateway owns the insert -> compute -> publish-result
//! pipeline's front end: admission, then three side effects in a fixed
//! order. The sequence is best-effort by contract, not by accident: there
//! is no transaction and no rollback, so a failure partway through leaves
//! the earlier effects in place.

use cache::{CacheError, Notifier, PLACEHOLDER, ValueCache};
use fibflow_core::MAX_INDEX;
use std::collections::HashMap;
use std::num::IntErrorKind;
use std::sync::Arc;
use store::{StoreError, Submission, SubmissionStore};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
  #[error("Index too high")]
  IndexTooHigh,
  #[error("Cache: {0}")]
  Cache(#[from] CacheError),
  #[error("Store: {0}")]
  Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Write path: accepts one index submission
pub struct SubmissionGateway {
  values: Arc<dyn ValueCache>,
  notifier: Arc<dyn Notifier>,
  submissions: Arc<dyn SubmissionStore>,
}

impl SubmissionGateway {
  pub fn new(values: Arc<dyn ValueCache>, notifier: Arc<dyn Notifier>, submissions: Arc<dyn SubmissionStore>) -> Self {
    Self {
      values,
      notifier,
      submissions,
    }
  }

  /// Accept one index in textual form.
  ///
  /// Admission checks only the upper bound. Negative and non-numeric
  /// indices are let through on purpose: a non-numeric index runs the
  /// first two side effects and then fails at the store append, exactly
  /// as the deployed system behaves.
  ///
  /// Side-effect order is fixed: placeholder write, then publish, then
  /// store append. The placeholder lands before any notification is
  /// visible, so a reader never sees a notified index without at least
  /// the placeholder.
  pub async fn submit(&self, index: &str) -> Result<()> {
    match index.trim().parse::<i64>() {
      Ok(n) if n > MAX_INDEX => return Err(GatewayError::IndexTooHigh),
      // A positive value too large for i64 is certainly above the bound;
      // it must not slip past admission just because it overflowed.
      Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow) => {
        return Err(GatewayError::IndexTooHigh);
      }
      _ => {}
    }

    self.values.set(index, PLACEHOLDER).await?;
    self.notifier.publish(index).await?;
    self.submissions.append(index).await?;
    Ok(())
  }
}

/// Read path: snapshot views of the cache and the submission history.
/// No consistency guarantee relative to concurrent writes.
pub struct ReadGateway {
  values: Arc<dyn ValueCache>,
  submissions: Arc<dyn SubmissionStore>,
}

impl ReadGateway {
  pub fn new(values: Arc<dyn ValueCache>, submissions: Arc<dyn SubmissionStore>) -> Self {
    Self { values, submissions }
  }

  /// Current cache contents: index -> placeholder or result.
  pub async fn current(&self) -> Result<HashMap<String, String>> {
    Ok(self.values.all().await?)
  }

  /// Full submission history, unordered.
  pub async fn history(&self) -> Result<Vec<Submission>> {
    Ok(self.submissions.all().await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::Mutex;

  /// Shared operation log so tests can assert side-effect order
  type OpLog = Arc<Mutex<Vec<String>>>;

  struct FakeCache {
    log: OpLog,
    entries: Mutex<HashMap<String, String>>,
  }

  #[async_trait]
  impl ValueCache for FakeCache {
    async fn set(&self, index: &str, value: &str) -> cache::Result<()> {
      self.log.lock().unwrap().push(format!("cache:{index}"));
      self.entries.lock().unwrap().insert(index.to_string(), value.to_string());
      Ok(())
    }

    async fn all(&self) -> cache::Result<HashMap<String, String>> {
      Ok(self.entries.lock().unwrap().clone())
    }
  }

  struct FakeNotifier {
    log: OpLog,
  }

  #[async_trait]
  impl Notifier for FakeNotifier {
    async fn publish(&self, index: &str) -> cache::Result<()> {
      self.log.lock().unwrap().push(format!("publish:{index}"));
      Ok(())
    }
  }

  /// Parses like the real store, so non-numeric indices fail here
  struct FakeStore {
    log: OpLog,
    rows: Mutex<Vec<Submission>>,
  }

  #[async_trait]
  impl SubmissionStore for FakeStore {
    async fn append(&self, index: &str) -> store::Result<()> {
      let number: i32 = index
        .trim()
        .parse()
        .map_err(|_| StoreError::BadIndex(index.to_string()))?;
      self.log.lock().unwrap().push(format!("store:{index}"));
      self.rows.lock().unwrap().push(Submission { number });
      Ok(())
    }

    async fn all(&self) -> store::Result<Vec<Submission>> {
      Ok(self.rows.lock().unwrap().clone())
    }
  }

  fn make_gateway() -> (OpLog, SubmissionGateway) {
    let log: OpLog = Arc::new(Mutex::new(Vec::new()));
    let gateway = SubmissionGateway::new(
      Arc::new(FakeCache {
        log: Arc::clone(&log),
        entries: Mutex::new(HashMap::new()),
      }),
      Arc::new(FakeNotifier { log: Arc::clone(&log) }),
      Arc::new(FakeStore {
        log: Arc::clone(&log),
        rows: Mutex::new(Vec::new()),
      }),
    );
    (log, gateway)
  }

  #[tokio::test]
  async fn test_rejects_above_limit_with_no_side_effects() {
    let (log, gateway) = make_gateway();

    let err = gateway.submit("45").await.unwrap_err();
    assert!(matches!(err, GatewayError::IndexTooHigh));
    assert!(log.lock().unwrap().is_empty(), "no side effect may run on rejection");
  }

  #[tokio::test]
  async fn test_rejects_index_overflowing_i64_with_no_side_effects() {
    let (log, gateway) = make_gateway();

    let err = gateway.submit("99999999999999999999").await.unwrap_err();
    assert!(matches!(err, GatewayError::IndexTooHigh));
    assert!(log.lock().unwrap().is_empty(), "no side effect may run on rejection");
  }

  #[tokio::test]
  async fn test_negative_overflow_is_still_admitted() {
    let (log, gateway) = make_gateway();

    // Far below the bound, so admission lets it through; it dies at the
    // store append like any other index the store cannot hold.
    let err = gateway.submit("-99999999999999999999").await.unwrap_err();
    assert!(matches!(err, GatewayError::Store(StoreError::BadIndex(_))));
    assert_eq!(log.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_accepts_at_limit() {
    let (_log, gateway) = make_gateway();
    gateway.submit("40").await.unwrap();
  }

  #[tokio::test]
  async fn test_side_effects_run_in_fixed_order() {
    let (log, gateway) = make_gateway();

    gateway.submit("5").await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["cache:5", "publish:5", "store:5"]);
  }

  #[tokio::test]
  async fn test_negative_index_is_admitted() {
    let (log, gateway) = make_gateway();

    gateway.submit("-3").await.unwrap();
    assert_eq!(log.lock().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn test_non_numeric_fails_at_store_after_partial_effects() {
    let (log, gateway) = make_gateway();

    let err = gateway.submit("banana").await.unwrap_err();
    assert!(matches!(err, GatewayError::Store(StoreError::BadIndex(_))));
    // Placeholder and publish already happened; nothing is rolled back.
    assert_eq!(*log.lock().unwrap(), vec!["cache:banana", "publish:banana"]);
  }

  #[tokio::test]
  async fn test_duplicate_submissions_both_accepted() {
    let (log, gateway) = make_gateway();

    gateway.submit("7").await.unwrap();
    gateway.submit("7").await.unwrap();
    assert_eq!(log.lock().unwrap().iter().filter(|op| *op == "store:7").count(), 2);
  }
}
