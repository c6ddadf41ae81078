//! HTTP API for FeedFlow.
//!
//! JSON endpoints under `/api` for feeds, items, digests, settings, and
//! administration, plus a plain `/health` check.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
