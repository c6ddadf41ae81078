//! Feed handlers.

use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::datetime::today;
use crate::feed::opml::{build_opml, export_filename};
use crate::feed::{FeedService, FeedUpdate, SubscribeRequest};
use crate::llm::categorize_feed;
use crate::web::dto::{
    ApiResponse, CreateFeedRequest, FeedResponse, RefreshResponse, TagsResponse,
    TaskAcceptedResponse, UpdateFeedRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/feeds - The caller's feeds with item counters.
pub async fn list_feeds(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<FeedResponse>>>, ApiError> {
    let feeds = state.feeds().list_feeds(auth.id()).await?;
    Ok(Json(ApiResponse::new(
        feeds.into_iter().map(FeedResponse::from).collect(),
    )))
}

/// POST /api/feeds - Subscribe to a feed.
///
/// Tag classification is scheduled in the background once the feed and its
/// first items are stored.
pub async fn create_feed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFeedRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RefreshResponse>>), ApiError> {
    let mut request = SubscribeRequest::new(req.url);
    if let Some(pattern) = req.title_filter.filter(|p| !p.trim().is_empty()) {
        request = request.with_title_filter(pattern);
    }

    let (feed, outcome) = state.feeds().subscribe(auth.id(), &request).await?;

    let feed_id = feed.id;
    let db = state.db.clone();
    let llm = state.llm.clone();
    state.tasks.spawn("auto_categorize", auth.id(), async move {
        let tags = categorize_feed(&db, &llm, feed_id).await?;
        tracing::info!(feed_id, ?tags, "Feed categorized");
        Ok(())
    });

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(RefreshResponse::from((feed, outcome)))),
    ))
}

/// GET /api/feeds/:id - One of the caller's feeds.
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(feed_id): Path<i64>,
) -> Result<Json<ApiResponse<FeedResponse>>, ApiError> {
    let feed = state.feeds().get_feed(auth.id(), feed_id).await?;
    Ok(Json(ApiResponse::new(feed.into())))
}

/// PATCH /api/feeds/:id - Update tags, default read status, or title filter.
pub async fn update_feed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(feed_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateFeedRequest>,
) -> Result<Json<ApiResponse<FeedResponse>>, ApiError> {
    let mut update = FeedUpdate::new();
    if let Some(tags) = req.tags {
        update = update.tags(tags.into_iter().map(|t| t.trim().to_string()).collect());
    }
    if let Some(read) = req.default_read_status {
        update = update.default_read_status(read);
    }
    if let Some(pattern) = req.title_filter {
        update = update.title_filter(pattern);
    }

    let feed = state.feeds().update_feed(auth.id(), feed_id, &update).await?;
    Ok(Json(ApiResponse::new(feed.into())))
}

/// DELETE /api/feeds/:id - Unsubscribe, deleting the feed's items.
pub async fn delete_feed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(feed_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.feeds().delete_feed(auth.id(), feed_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/feeds/:id/refresh - Fetch a feed now.
pub async fn refresh_feed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(feed_id): Path<i64>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let result = state.feeds().refresh_feed(auth.id(), feed_id).await?;
    Ok(Json(ApiResponse::new(result.into())))
}

/// POST /api/feeds/refresh-all - Refresh every feed in the background.
pub async fn refresh_all_feeds(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> (StatusCode, Json<ApiResponse<TaskAcceptedResponse>>) {
    let user_id = auth.id();
    let db = state.db.clone();
    let fetcher = state.fetcher.clone();
    let concurrency = state.refresh_concurrency;

    let task_id = state.tasks.spawn("refresh_all", user_id, async move {
        FeedService::new(&db, &fetcher)
            .refresh_all(user_id, concurrency)
            .await?;
        Ok(())
    });

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(TaskAcceptedResponse { task_id })),
    )
}

/// POST /api/feeds/:id/auto-categorize - Classify a feed and store its tags.
pub async fn auto_categorize_feed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(feed_id): Path<i64>,
) -> Result<Json<ApiResponse<TagsResponse>>, ApiError> {
    state.feeds().get_feed(auth.id(), feed_id).await?;
    let tags = categorize_feed(&state.db, &state.llm, feed_id).await?;
    Ok(Json(ApiResponse::new(TagsResponse { tags })))
}

/// GET /api/feeds/opml/export - Download the caller's feeds as OPML.
pub async fn export_opml(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let feeds: Vec<_> = state
        .feeds()
        .list_feeds(auth.id())
        .await?
        .into_iter()
        .map(|f| f.feed)
        .collect();
    let xml = build_opml(&feeds)?;

    let headers = [
        (CONTENT_TYPE, "application/xml; charset=utf-8".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export_filename(today())),
        ),
    ];
    Ok((headers, xml))
}
