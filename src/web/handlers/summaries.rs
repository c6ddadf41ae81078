//! Daily digest handlers.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use std::sync::Arc;

use crate::digest::{stream_digest, DigestService};
use crate::web::dto::{
    ApiResponse, GenerateSummaryRequest, SaveSummaryRequest, SummaryResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

fn force_flag(body: Option<Json<GenerateSummaryRequest>>) -> bool {
    body.map(|Json(req)| req.force).unwrap_or(false)
}

/// GET /api/summaries/today - Today's digest, or `null`.
pub async fn today_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<SummaryResponse>>, ApiError> {
    let summary = DigestService::new(&state.db, &state.llm)
        .today(auth.id())
        .await?;
    Ok(Json(ApiResponse::new(SummaryResponse { summary })))
}

/// POST /api/summaries/generate - Generate today's digest in one call.
///
/// Returns the stored digest unless `force` is set; `null` when there is
/// nothing unread.
pub async fn generate_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Option<Json<GenerateSummaryRequest>>,
) -> Result<Json<ApiResponse<SummaryResponse>>, ApiError> {
    let outcome = DigestService::new(&state.db, &state.llm)
        .generate(auth.id(), force_flag(body))
        .await?;
    Ok(Json(ApiResponse::new(SummaryResponse {
        summary: outcome.into_summary(),
    })))
}

/// POST /api/summaries/stream - Generate today's digest as server-sent events.
///
/// Each event carries a JSON object with a `type` of `start`, `token`,
/// `error`, or `done`.
pub async fn stream_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Option<Json<GenerateSummaryRequest>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = stream_digest(
        state.db.clone(),
        state.llm.clone(),
        auth.id(),
        force_flag(body),
    )
    .map(|event| Event::default().json_data(event));

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// POST /api/summaries/save - Store a digest assembled by the client.
pub async fn save_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<SaveSummaryRequest>,
) -> Result<Json<ApiResponse<SummaryResponse>>, ApiError> {
    let summary = DigestService::new(&state.db, &state.llm)
        .save(auth.id(), &req.content, req.item_count, req.force)
        .await?;
    Ok(Json(ApiResponse::new(SummaryResponse {
        summary: Some(summary),
    })))
}

/// POST /api/summaries/check-and-generate - Make sure today's digest exists.
///
/// Never fails on generation problems; the digest is `null` instead.
pub async fn check_and_generate_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Json<ApiResponse<SummaryResponse>> {
    let summary = DigestService::new(&state.db, &state.llm)
        .check_and_generate(auth.id())
        .await;
    Json(ApiResponse::new(SummaryResponse { summary }))
}
