//! Template library endpoints

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::CreatedResponse,
    },
    device::Template,
};

/// GET /api/templates
pub async fn list_templates(State(state): State<ApiState>) -> ApiResult<Json<Vec<Template>>> {
    Ok(Json(state.store.list_templates().await?))
}

/// POST /api/templates
pub async fn create_template(
    State(state): State<ApiState>,
    payload: Result<Json<Template>, JsonRejection>,
) -> ApiResult<Json<CreatedResponse>> {
    let Json(template) = payload?;
    if template.name.trim().is_empty() {
        return Err(ApiError::InvalidRequest("name required".to_string()));
    }

    let created = state.store.create_template(template).await?;
    Ok(Json(CreatedResponse::new(created.id)))
}
