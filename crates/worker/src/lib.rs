//! Compute worker: drains the insert channel and fills in results.
//!
//! Messages are handled strictly one at a time; the Fibonacci computation
//! is synchronous CPU work inside the handler, so a slow index delays
//! every message behind it. That is the intended behavior, not a bug.

use cache::ValueCache;
use fibflow_core::FibSolver;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consume notifications until the stream ends.
///
/// Failures stay local to the message that caused them: an unparseable
/// index or a failed cache write is logged and dropped so one bad message
/// cannot take down the subscription. A dropped message leaves its cache
/// entry at the placeholder forever; there is no redelivery.
pub async fn run<S>(mut messages: S, values: Arc<dyn ValueCache>, solver: Arc<dyn FibSolver>)
where
  S: Stream<Item = String> + Unpin,
{
  while let Some(payload) = messages.next().await {
    handle_message(&payload, values.as_ref(), solver.as_ref()).await;
  }
  info!("Notification stream closed, worker exiting");
}

async fn handle_message(payload: &str, values: &dyn ValueCache, solver: &dyn FibSolver) {
  let index: i64 = match payload.trim().parse() {
    Ok(n) => n,
    Err(_) => {
      warn!("Dropping notification with non-integer index: {payload:?}");
      return;
    }
  };

  let result = solver.compute(index);
  debug!("Computed fib({index}) = {result}");

  // The raw payload is the cache field, matching what the gateway wrote
  // the placeholder under.
  if let Err(e) = values.set(payload, &result.to_string()).await {
    warn!("Failed to write result for index {payload:?}, entry stays a placeholder: {e}");
  }
}
