//! Per-user settings handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::UserRepository;
use crate::retention::{self, RetentionSettings};
use crate::web::dto::{
    ApiResponse, UpdateCleanupSettingsRequest, UpdateUserSettingsRequest, UserSettingsResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/settings/cleanup - Retention settings.
pub async fn get_cleanup_settings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<RetentionSettings>>, ApiError> {
    let settings = retention::settings(state.db.pool(), auth.id()).await?;
    Ok(Json(ApiResponse::new(settings)))
}

/// PATCH /api/settings/cleanup - Update retention settings.
pub async fn update_cleanup_settings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateCleanupSettingsRequest>,
) -> Result<Json<ApiResponse<RetentionSettings>>, ApiError> {
    let settings = retention::update_settings(
        state.db.pool(),
        auth.id(),
        req.item_retention_days,
        req.item_retention_only_read,
    )
    .await?;
    Ok(Json(ApiResponse::new(settings)))
}

/// GET /api/user/settings - Digest language preference.
pub async fn get_user_settings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserSettingsResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(auth.id())
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(Json(ApiResponse::new(UserSettingsResponse {
        summary_language: user.summary_language,
    })))
}

/// PATCH /api/user/settings - Change the digest language.
pub async fn update_user_settings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateUserSettingsRequest>,
) -> Result<Json<ApiResponse<UserSettingsResponse>>, ApiError> {
    UserRepository::new(state.db.pool())
        .update_summary_language(auth.id(), req.summary_language)
        .await?;
    Ok(Json(ApiResponse::new(UserSettingsResponse {
        summary_language: req.summary_language,
    })))
}
