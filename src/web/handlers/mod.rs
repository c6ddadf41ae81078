//! API handlers.

pub mod admin;
pub mod auth;
pub mod feeds;
pub mod items;
pub mod settings;
pub mod summaries;
pub mod tasks;

pub use admin::*;
pub use auth::*;
pub use feeds::*;
pub use items::*;
pub use settings::*;
pub use summaries::*;
pub use tasks::*;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::config::Config;
use crate::db::{Database, Role, User, UserRepository};
use crate::feed::{BackgroundTasks, FeedFetcher, FeedService};
use crate::llm::LlmClient;
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims};
use crate::Result;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub fetcher: FeedFetcher,
    pub llm: LlmClient,
    pub tasks: BackgroundTasks,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Feeds fetched at once by a refresh-all task.
    pub refresh_concurrency: usize,
}

impl AppState {
    /// Build the state from configuration.
    pub fn new(db: Database, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            fetcher: FeedFetcher::new(&config.feed)?,
            llm: LlmClient::new(&config.llm)?,
            tasks: BackgroundTasks::new(config.feed.max_background_tasks),
            encoding_key: EncodingKey::from_secret(config.server.jwt_secret.as_bytes()),
            access_token_expiry: config.server.jwt_access_token_expiry_secs,
            refresh_concurrency: config.feed.refresh_concurrency,
        })
    }

    /// Feed service bound to this state.
    pub fn feeds(&self) -> FeedService<'_> {
        FeedService::new(&self.db, &self.fetcher)
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> std::result::Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// Load the caller and check their current role.
    ///
    /// The role is read from the database, so a demotion takes effect
    /// before the caller's token expires.
    pub async fn require_role(
        &self,
        auth: &AuthUser,
        required: Role,
    ) -> std::result::Result<User, ApiError> {
        let user = UserRepository::new(self.db.pool())
            .get_by_id(auth.id())
            .await?
            .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
        if !user.has_role(required) {
            return Err(ApiError::forbidden(format!("{} role required", required)));
        }
        Ok(user)
    }
}
