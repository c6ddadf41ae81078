//! Item handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::feed::{ItemQuery, DEFAULT_PAGE_SIZE};
use crate::retention::{self, CleanupPreview};
use crate::web::dto::{
    ApiResponse, CountResponse, DeletedResponse, ItemResponse, ItemsQuery, MarkAllReadRequest,
    PaginatedResponse, SetReadRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/items - List the caller's items, newest first.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<PaginatedResponse<ItemResponse>>, ApiError> {
    let query = ItemQuery {
        feed_id: query.feed_id,
        tag: query.tag.filter(|t| !t.trim().is_empty()),
        read: query.read,
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    };

    let page = state.feeds().list_items(auth.id(), &query).await?;
    Ok(Json(PaginatedResponse::new(
        page.items.into_iter().map(ItemResponse::from).collect(),
        page.page,
        page.per_page,
        page.total,
    )))
}

/// GET /api/items/:id - One item with its feed title.
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<ApiResponse<ItemResponse>>, ApiError> {
    let item = state.feeds().get_item(auth.id(), item_id).await?;
    Ok(Json(ApiResponse::new(item.into())))
}

/// PATCH /api/items/:id/read - Set the read flag.
pub async fn set_item_read(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<SetReadRequest>,
) -> Result<Json<ApiResponse<ItemResponse>>, ApiError> {
    let item = state
        .feeds()
        .set_item_read(auth.id(), item_id, req.read)
        .await?;
    Ok(Json(ApiResponse::new(item.into())))
}

/// POST /api/items/mark-all-read - Mark unread items read.
///
/// Scoped to one feed or one tag when given, otherwise every feed.
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Option<Json<MarkAllReadRequest>>,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let tag = req.tag.as_deref().filter(|t| !t.trim().is_empty());
    let count = state
        .feeds()
        .mark_all_read(auth.id(), req.feed_id, tag)
        .await?;
    Ok(Json(ApiResponse::new(CountResponse { count })))
}

/// GET /api/items/cleanup - Preview what a cleanup would delete.
pub async fn preview_cleanup(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<CleanupPreview>>, ApiError> {
    let preview = retention::preview(state.db.pool(), auth.id()).await?;
    Ok(Json(ApiResponse::new(preview)))
}

/// POST /api/items/cleanup - Delete items past the retention period.
pub async fn run_cleanup(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<DeletedResponse>>, ApiError> {
    let deleted_count = retention::run_cleanup(state.db.pool(), auth.id()).await?;
    Ok(Json(ApiResponse::new(DeletedResponse { deleted_count })))
}
