//! Web API Settings Tests
//!
//! Integration tests for per-user digest and retention settings.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{bearer, register_user, spawn_app};

#[tokio::test]
async fn test_user_settings() {
    let app = spawn_app().await;
    let token = register_user(&app.server, "reader@example.com").await;

    let body: Value = app
        .server
        .get("/api/user/settings")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(body["data"]["summaryLanguage"], "zh");

    let response = app
        .server
        .patch("/api/user/settings")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "summaryLanguage": "en" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["summaryLanguage"], "en");

    let body: Value = app
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(body["data"]["summaryLanguage"], "en");
}

#[tokio::test]
async fn test_user_settings_rejects_unknown_language() {
    let app = spawn_app().await;
    let token = register_user(&app.server, "reader@example.com").await;

    let response = app
        .server
        .patch("/api/user/settings")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "summaryLanguage": "fr" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cleanup_settings() {
    let app = spawn_app().await;
    let token = register_user(&app.server, "reader@example.com").await;

    let body: Value = app
        .server
        .get("/api/settings/cleanup")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(body["data"]["itemRetentionDays"], 30);
    assert_eq!(body["data"]["itemRetentionOnlyRead"], false);
    assert!(body["data"]["lastItemCleanup"].is_null());

    // Fields left out keep their value
    let body: Value = app
        .server
        .patch("/api/settings/cleanup")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "itemRetentionOnlyRead": true }))
        .await
        .json();
    assert_eq!(body["data"]["itemRetentionDays"], 30);
    assert_eq!(body["data"]["itemRetentionOnlyRead"], true);

    let body: Value = app
        .server
        .patch("/api/settings/cleanup")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "itemRetentionDays": 7 }))
        .await
        .json();
    assert_eq!(body["data"]["itemRetentionDays"], 7);
    assert_eq!(body["data"]["itemRetentionOnlyRead"], true);
}

#[tokio::test]
async fn test_cleanup_settings_rejects_negative_days() {
    let app = spawn_app().await;
    let token = register_user(&app.server, "reader@example.com").await;

    let response = app
        .server
        .patch("/api/settings/cleanup")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "itemRetentionDays": -5 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
