//! FeedFlow - a multi-user RSS/Atom reader service
//!
//! Users subscribe to feeds, browse and mark items, and receive daily
//! digests written by an OpenAI-compatible chat-completion API, all over
//! a JSON HTTP API.

pub mod auth;
pub mod config;
pub mod datetime;
pub mod db;
pub mod digest;
pub mod error;
pub mod feed;
pub mod init;
pub mod llm;
pub mod logging;
pub mod retention;
pub mod web;

pub use auth::{authenticate, hash_password, register, verify_password, RegistrationRequest};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository};
pub use digest::{DailySummary, DigestService};
pub use error::{FeedflowError, FetchError, Result};
pub use feed::{Feed, FeedFetcher, FeedService, Item};
pub use init::Initializer;
pub use llm::LlmClient;
pub use web::WebServer;
