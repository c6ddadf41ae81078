//! Router configuration for the HTTP API.

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    auto_categorize_feed, check_and_generate_summary, create_feed, delete_feed, export_opml,
    generate_summary, get_cleanup_settings, get_feed, get_item, get_task, get_user_settings,
    list_config, list_feeds, list_items, list_users, login, mark_all_read, me, preview_cleanup,
    refresh_all_feeds, refresh_feed, register, run_cleanup, save_summary, set_item_read,
    stream_summary, today_summary, update_cleanup_settings, update_config, update_feed,
    update_user_role, update_user_settings, AppState,
};
use super::middleware::{auth_rate_limit, create_cors_layer, jwt_auth, JwtState, RateLimitState};

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    rate_limit: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    // Credential endpoints are rate limited per client IP
    let auth_public_routes = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .layer(middleware::from_fn(move |req, next| {
            let state = rate_limit.clone();
            auth_rate_limit(state, req, next)
        }));

    let auth_routes = Router::new()
        .merge(auth_public_routes)
        .route("/me", get(me));

    let feed_routes = Router::new()
        .route("/", get(list_feeds).post(create_feed))
        .route("/refresh-all", post(refresh_all_feeds))
        .route("/opml/export", get(export_opml))
        .route("/:id", get(get_feed).patch(update_feed).delete(delete_feed))
        .route("/:id/refresh", post(refresh_feed))
        .route("/:id/auto-categorize", post(auto_categorize_feed));

    let item_routes = Router::new()
        .route("/", get(list_items))
        .route("/mark-all-read", post(mark_all_read))
        .route("/cleanup", get(preview_cleanup).post(run_cleanup))
        .route("/:id", get(get_item))
        .route("/:id/read", patch(set_item_read));

    let summary_routes = Router::new()
        .route("/today", get(today_summary))
        .route("/generate", post(generate_summary))
        .route("/stream", post(stream_summary))
        .route("/save", post(save_summary))
        .route("/check-and-generate", post(check_and_generate_summary));

    let admin_routes = Router::new()
        .route("/config", get(list_config))
        .route("/config/:key", put(update_config))
        .route("/users", get(list_users))
        .route("/users/:id/role", patch(update_user_role));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/feeds", feed_routes)
        .nest("/items", item_routes)
        .nest("/summaries", summary_routes)
        .route(
            "/settings/cleanup",
            get(get_cleanup_settings).patch(update_cleanup_settings),
        )
        .route(
            "/user/settings",
            get(get_user_settings).patch(update_user_settings),
        )
        .route("/tasks/:id", get(get_task))
        .nest("/admin", admin_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
