//! Administration handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use utoipa;

use crate::db::{config_keys, Role, SystemConfigRepository, UserRepository};
use crate::web::dto::{
    ApiResponse, ConfigEntryResponse, UpdateConfigRequest, UpdateRoleRequest, UserInfo,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Check a value against the key's expected format.
fn validate_config_value(key: &str, value: &str) -> Result<(), ApiError> {
    let value = value.trim();
    let valid = match key {
        config_keys::MAX_ITEMS_PER_FEED => value.parse::<i64>().map(|n| n > 0).unwrap_or(false),
        config_keys::REGISTRATION_ENABLED => value == "true" || value == "false",
        config_keys::OPENAI_BASE_URL => {
            value.is_empty() || value.starts_with("http://") || value.starts_with("https://")
        }
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(ApiError::from(crate::FeedflowError::Validation(format!(
            "invalid value for {key}"
        ))))
    }
}

/// GET /api/admin/config - List system configuration.
#[utoipa::path(
    get,
    path = "/admin/config",
    tag = "admin",
    responses(
        (status = 200, description = "System configuration entries", body = Vec<ConfigEntryResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_config(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<ConfigEntryResponse>>>, ApiError> {
    state.require_role(&auth, Role::Admin).await?;

    let entries = SystemConfigRepository::new(state.db.pool()).list().await?;
    Ok(Json(ApiResponse::new(
        entries.into_iter().map(ConfigEntryResponse::from).collect(),
    )))
}

/// PUT /api/admin/config/:key - Set a system configuration value.
#[utoipa::path(
    put,
    path = "/admin/config/{key}",
    tag = "admin",
    params(
        ("key" = String, Path, description = "Configuration key")
    ),
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Entry updated", body = ConfigEntryResponse),
        (status = 400, description = "Invalid value"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Unknown key")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(key): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateConfigRequest>,
) -> Result<Json<ApiResponse<ConfigEntryResponse>>, ApiError> {
    let admin = state.require_role(&auth, Role::Admin).await?;

    if !config_keys::ALL.contains(&key.as_str()) {
        return Err(ApiError::not_found(format!("config key {key} not found")));
    }
    validate_config_value(&key, &req.value)?;

    let repo = SystemConfigRepository::new(state.db.pool());
    repo.set(&key, req.value.trim()).await?;
    tracing::info!(admin_id = admin.id, key = %key, "System config updated");

    let entry = repo
        .list()
        .await?
        .into_iter()
        .find(|e| e.key == key)
        .ok_or_else(|| ApiError::not_found(format!("config key {key} not found")))?;
    Ok(Json(ApiResponse::new(entry.into())))
}

/// GET /api/admin/users - List users.
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    responses(
        (status = 200, description = "All users", body = Vec<UserInfo>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    state.require_role(&auth, Role::Admin).await?;

    let users = UserRepository::new(state.db.pool()).list().await?;
    Ok(Json(ApiResponse::new(
        users.into_iter().map(UserInfo::from).collect(),
    )))
}

/// PATCH /api/admin/users/:id/role - Change a user's role.
///
/// Only super admins may do this, and the last super admin cannot be
/// demoted.
#[utoipa::path(
    patch,
    path = "/admin/users/{id}/role",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserInfo),
        (status = 403, description = "Super admin access required"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Last super admin cannot be demoted")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let admin = state.require_role(&auth, Role::SuperAdmin).await?;

    let repo = UserRepository::new(state.db.pool());
    let target = repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if target.role == Role::SuperAdmin
        && req.role != Role::SuperAdmin
        && repo.count_by_role(Role::SuperAdmin).await? <= 1
    {
        return Err(ApiError::conflict("cannot demote the last super admin"));
    }

    repo.update_role(user_id, req.role).await?;
    tracing::info!(
        admin_id = admin.id,
        user_id,
        from = %target.role,
        to = %req.role,
        "User role changed"
    );

    let user = repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(Json(ApiResponse::new(user.into())))
}
