//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::{error::ApiResult, state::ApiState, types::HealthResponse};

/// GET /api/health
///
/// Reports the process as up together with the storage backend status
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<HealthResponse>> {
    let health = state.store.health_check().await?;

    Ok(Json(HealthResponse {
        ok: health.healthy,
        storage: health.message,
    }))
}
