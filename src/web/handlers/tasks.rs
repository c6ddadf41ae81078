//! Background task status handler.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::feed::TaskInfo;
use crate::web::dto::ApiResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/tasks/:id - State of one of the caller's background tasks.
///
/// Another user's task is reported as missing.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(task_id): Path<u64>,
) -> Result<Json<ApiResponse<TaskInfo>>, ApiError> {
    let task = state
        .tasks
        .get(task_id)
        .filter(|t| t.user_id == auth.id())
        .ok_or_else(|| ApiError::not_found("task not found"))?;
    Ok(Json(ApiResponse::new(task)))
}
