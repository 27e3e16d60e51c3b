//! Device endpoints

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use tracing::{debug, instrument};

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{CreatedResponse, LogsQuery, OkResponse},
    },
    device::{Device, LogEntry},
};

/// GET /api/devices
///
/// All devices, newest first
pub async fn list_devices(State(state): State<ApiState>) -> ApiResult<Json<Vec<Device>>> {
    Ok(Json(state.store.list_devices().await?))
}

/// POST /api/devices
///
/// Create a device, or replace it when the id already exists
#[instrument(skip_all)]
pub async fn upsert_device(
    State(state): State<ApiState>,
    payload: Result<Json<Device>, JsonRejection>,
) -> ApiResult<Json<CreatedResponse>> {
    let Json(device) = payload?;
    if device.name.trim().is_empty() {
        return Err(ApiError::InvalidRequest("name required".to_string()));
    }

    let saved = state.store.upsert_device(device).await?;
    debug!(id = %saved.id, enabled = saved.enabled, "device saved");

    Ok(Json(CreatedResponse::new(saved.id)))
}

/// DELETE /api/devices/:id
///
/// Removes the device and its log entries
#[instrument(skip_all, fields(id = %id))]
pub async fn delete_device(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OkResponse>> {
    if !state.store.delete_device(&id).await? {
        return Err(ApiError::NotFound(format!("device not found: {}", id)));
    }

    Ok(Json(OkResponse::ok()))
}

/// GET /api/devices/:id/logs?limit=N
///
/// The N most recent log entries, oldest first
pub async fn device_logs(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    let Query(query) = query?;
    Ok(Json(state.store.query_logs(&id, query.limit()).await?))
}
