//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{authenticate, register as register_user, RegistrationRequest};
use crate::db::UserRepository;
use crate::web::dto::{ApiResponse, LoginRequest, LoginResponse, RegisterRequest, UserInfo, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// POST /api/auth/register - Create an account and log in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    let mut request = RegistrationRequest::new(req.email, req.password);
    if let Some(name) = req.name {
        request = request.with_name(name);
    }
    let user = register_user(state.db.pool(), request).await?;

    let access_token = state.generate_access_token(&user)?;
    let response = LoginResponse {
        access_token,
        expires_in: state.access_token_expiry,
        user: user.into(),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - Exchange credentials for an access token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let user = authenticate(state.db.pool(), &req.email, &req.password)
        .await
        .map_err(|e| {
            tracing::debug!(email = %req.email, "Login failed: {}", e);
            ApiError::unauthorized("Invalid email or password")
        })?;

    let access_token = state.generate_access_token(&user)?;
    tracing::info!(user_id = user.id, "User logged in");

    let response = LoginResponse {
        access_token,
        expires_in: state.access_token_expiry,
        user: user.into(),
    };
    Ok(Json(ApiResponse::new(response)))
}

/// GET /api/auth/me - Current user.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(auth.id())
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
    Ok(Json(ApiResponse::new(user.into())))
}
