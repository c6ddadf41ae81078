//! Test helpers for the HTTP API tests.
//!
//! Provides an in-process API server plus local stand-ins for a feed
//! publisher and a chat-completion API.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_test::TestServer;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use feedflow::config::Config;
use feedflow::db::{config_keys, SystemConfigRepository};
use feedflow::web::handlers::AppState;
use feedflow::web::middleware::{JwtState, RateLimitState};
use feedflow::web::router::create_router;
use feedflow::{Database, Initializer};

pub const ADMIN_EMAIL: &str = "admin@feedflow.local";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "password123";

/// API server running on an in-memory database.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub state: Arc<AppState>,
}

/// Create a test configuration.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.jwt_secret = "test-secret-key-for-testing-only".to_string();
    config.server.login_rate_limit = 1000;
    config.feed.allow_private_hosts = true;
    config.feed.fetch_timeout_secs = 5;
    config.admin.password = ADMIN_PASSWORD.to_string();
    config.llm.base_url = String::new();
    config.llm.api_key = String::new();
    config
}

/// Start the API with the default test configuration.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

/// Start the API with a custom configuration.
pub async fn spawn_app_with(config: Config) -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    Initializer::new()
        .run(&db, &config)
        .await
        .expect("Failed to initialize database");

    let state = Arc::new(AppState::new(db.clone(), &config).expect("Failed to build state"));
    let jwt_state = Arc::new(JwtState::new(&config.server.jwt_secret));
    let rate_limit = Arc::new(RateLimitState::new(config.server.login_rate_limit));

    let router = create_router(
        state.clone(),
        jwt_state,
        rate_limit,
        &config.server.cors_origins,
    );
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp { server, db, state }
}

/// Authorization header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Register a user and return their access token.
pub async fn register_user(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

/// Log in and return the access token.
pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

/// Log in as the seeded super admin.
pub async fn login_admin(server: &TestServer) -> String {
    login(server, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Subscribe to a feed and return the response body.
pub async fn subscribe(server: &TestServer, token: &str, url: &str) -> Value {
    let response = server
        .post("/api/feeds")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({ "url": url }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

/// Poll a background task until it finishes.
pub async fn wait_for_task(server: &TestServer, token: &str, task_id: u64) -> Value {
    for _ in 0..100 {
        let body: Value = server
            .get(&format!("/api/tasks/{}", task_id))
            .add_header(AUTHORIZATION, bearer(token))
            .await
            .json();
        let state = body["data"]["state"].as_str().unwrap_or_default().to_string();
        if state == "completed" || state == "failed" {
            return body["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {} did not finish", task_id);
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

// ============================================================================
// Feed publisher
// ============================================================================

/// One entry of a generated RSS document.
pub struct Entry {
    pub title: String,
    pub link: String,
    pub pub_date: String,
}

pub fn entry(title: &str, link: &str, pub_date: &str) -> Entry {
    Entry {
        title: title.to_string(),
        link: link.to_string(),
        pub_date: pub_date.to_string(),
    }
}

/// Entry published `hours_ago` hours before now.
pub fn recent_entry(title: &str, link: &str, hours_ago: i64) -> Entry {
    let date = chrono::Utc::now() - chrono::Duration::hours(hours_ago);
    entry(title, link, &date.to_rfc2822())
}

/// Render an RSS 2.0 document.
pub fn rss(title: &str, entries: &[Entry]) -> String {
    let items: String = entries
        .iter()
        .map(|e| {
            format!(
                "<item><title>{}</title><link>{}</link><description>About {}</description><pubDate>{}</pubDate></item>",
                e.title, e.link, e.title, e.pub_date
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>{}</title><link>https://blog.example.com/</link><description>Test feed</description>{}</channel></rss>"#,
        title, items
    )
}

/// Local feed publisher whose document can be swapped between fetches.
pub struct FeedServer {
    addr: SocketAddr,
    body: Arc<RwLock<String>>,
}

impl FeedServer {
    pub async fn start(document: String) -> Self {
        let body = Arc::new(RwLock::new(document));
        let shared = body.clone();

        let router = Router::new()
            .route(
                "/feed.xml",
                get(move || {
                    let shared = shared.clone();
                    async move {
                        let doc = shared.read().unwrap().clone();
                        ([(CONTENT_TYPE, "application/rss+xml")], doc)
                    }
                }),
            )
            .route(
                "/broken.xml",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/page.html",
                get(|| async { ([(CONTENT_TYPE, "text/html")], "<html><body>hi</body></html>") }),
            )
            .route(
                "/slow.xml",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    ([(CONTENT_TYPE, "application/rss+xml")], rss("Slow", &[]))
                }),
            );

        Self {
            addr: serve(router).await,
            body,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/feed.xml", self.addr)
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn set_document(&self, document: String) {
        *self.body.write().unwrap() = document;
    }
}

/// URL on a local port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/feed.xml", addr)
}

// ============================================================================
// Chat-completion API
// ============================================================================

/// Start a chat-completion stand-in.
///
/// Plain calls answer with `reply`; streaming calls send `tokens` one
/// chunk each.
pub async fn start_llm_server(reply: &'static str, tokens: &'static [&'static str]) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| async move {
            if body["stream"].as_bool().unwrap_or(false) {
                let mut events: String = tokens
                    .iter()
                    .map(|t| {
                        format!(
                            "data: {}\n\n",
                            json!({ "choices": [{ "delta": { "content": t } }] })
                        )
                    })
                    .collect();
                events.push_str("data: [DONE]\n\n");
                ([(CONTENT_TYPE, "text/event-stream")], events).into_response()
            } else {
                Json(json!({ "choices": [{ "message": { "content": reply } }] })).into_response()
            }
        }),
    );
    format!("http://{}/v1", serve(router).await)
}

/// Start a chat-completion stand-in that answers every call with `status`.
pub async fn start_failing_llm_server(status: StatusCode) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move || async move { (status, Json(json!({ "error": { "message": "upstream" } }))) }),
    );
    format!("http://{}/v1", serve(router).await)
}

/// Start a chat-completion stand-in whose streaming answers break off
/// after `tokens`, without the closing `[DONE]`.
pub async fn start_interrupted_llm_server(tokens: &'static [&'static str]) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move || async move {
            let mut chunks: Vec<Result<String, std::io::Error>> = tokens
                .iter()
                .map(|t| {
                    Ok(format!(
                        "data: {}\n\n",
                        json!({ "choices": [{ "delta": { "content": t } }] })
                    ))
                })
                .collect();
            chunks.push(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection dropped",
            )));
            (
                [(CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(futures::stream::iter(chunks)),
            )
        }),
    );
    format!("http://{}/v1", serve(router).await)
}

/// Point the system configuration at a chat-completion API.
pub async fn configure_llm(db: &Database, base_url: &str) {
    let repo = SystemConfigRepository::new(db.pool());
    repo.set(config_keys::OPENAI_BASE_URL, base_url).await.unwrap();
    repo.set(config_keys::OPENAI_API_KEY, "sk-test-key-1234").await.unwrap();
    repo.set(config_keys::OPENAI_MODEL, "test-model").await.unwrap();
}
