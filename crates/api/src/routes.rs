//! HTTP surface for the submission and read gateways.

use crate::gateway::{GatewayError, ReadGateway, SubmissionGateway};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, http::StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
  pub submissions: Arc<SubmissionGateway>,
  pub reads: Arc<ReadGateway>,
}

/// Build the application router.
///
/// Every unmatched request gets the plain-text 404, including a wrong
/// method on a known path; there is no 405 on this surface.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health_handler).fallback(not_found_handler))
    .route("/values/current", get(current_handler).fallback(not_found_handler))
    .route("/values/all", get(all_handler).fallback(not_found_handler))
    .route("/values", post(submit_handler).fallback(not_found_handler))
    .fallback(not_found_handler)
    .with_state(state)
}

/// Liveness only; touches no backend
async fn health_handler() -> impl IntoResponse {
  Json(json!({"status": "healthy"}))
}

/// Cache snapshot. On a backing-store error the response degrades to an
/// empty map with a 500 instead of an opaque failure.
async fn current_handler(State(state): State<AppState>) -> impl IntoResponse {
  match state.reads.current().await {
    Ok(values) => (StatusCode::OK, Json(json!({"values": values}))),
    Err(e) => {
      error!("Failed to read values from cache: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"values": {}})))
    }
  }
}

/// Full submission history
async fn all_handler(State(state): State<AppState>) -> Response {
  match state.reads.history().await {
    Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
    Err(e) => {
      error!("Failed to read submission history: {e}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal Server Error"})),
      )
        .into_response()
    }
  }
}

/// Submission body. The index may arrive as a JSON string or number; the
/// pipeline works with its textual form either way.
#[derive(Debug, Deserialize)]
struct SubmitRequest {
  index: serde_json::Value,
}

fn index_text(value: &serde_json::Value) -> String {
  match value {
    serde_json::Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

async fn submit_handler(State(state): State<AppState>, Json(body): Json<SubmitRequest>) -> Response {
  let index = index_text(&body.index);

  match state.submissions.submit(&index).await {
    Ok(()) => (StatusCode::OK, Json(json!({"working": true}))).into_response(),
    Err(GatewayError::IndexTooHigh) => (
      StatusCode::UNPROCESSABLE_ENTITY,
      Json(json!({"error": "Index too high"})),
    )
      .into_response(),
    Err(e) => {
      error!("Submission failed for index {index:?}: {e}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal Server Error"})),
      )
        .into_response()
    }
  }
}

async fn not_found_handler() -> impl IntoResponse {
  (
    StatusCode::NOT_FOUND,
    "404 Error: The requested resource was not found.",
  )
}
