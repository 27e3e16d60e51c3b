//! Manual probe trigger

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
    },
    device::{ProbeOutcome, ProbeRequest},
};

fn has_text(body: &Value, key: &str) -> bool {
    body.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// POST /api/run-now
///
/// Runs one probe without touching the store. Probe failures are returned
/// as a failed outcome with status 200.
#[instrument(skip_all)]
pub async fn run_now(
    State(state): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ProbeOutcome>> {
    let Json(body) = payload?;
    if !has_text(&body, "requestType") || !has_text(&body, "urlOrHost") {
        return Err(ApiError::InvalidRequest(
            "requestType/urlOrHost required".to_string(),
        ));
    }

    let request: ProbeRequest = serde_json::from_value(body)?;
    let outcome = state.executor.run_now(&request).await;
    debug!(ok = outcome.ok, elapsed_ms = outcome.elapsed_ms, "run-now complete");

    Ok(Json(outcome))
}
