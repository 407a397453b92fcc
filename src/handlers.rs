//! HTTP handlers for the fan-out trigger service

use crate::error::DispatchError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "fanout-trigger"
    }))
}

/// Trigger endpoint
///
/// Launches a background dispatch from the configured target, count and
/// timeout, then acknowledges without waiting for any request to finish.
#[instrument(skip(state))]
pub async fn trigger(State(state): State<Arc<AppState>>) -> Result<&'static str, DispatchError> {
    let request = state.config.dispatch_request();

    info!(
        dispatch_id = %request.dispatch_id(),
        url = %request.target_url(),
        count = request.count(),
        timeout_secs = request.per_request_timeout().as_secs(),
        "Launching background dispatch"
    );

    let handle = state.dispatcher.dispatch(request)?;
    // Not awaited: the dispatch runs detached from this response
    debug!(dispatch_id = %handle.dispatch_id(), "Dispatch detached");

    Ok("OK")
}
