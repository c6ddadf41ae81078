//! One-shot application initialization.
//!
//! Seeds the system configuration and ensures a super-admin exists. Runs
//! once per process; concurrent callers wait for the same run.

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::auth::{register_with_role, RegistrationRequest};
use crate::config::Config;
use crate::db::{config_keys, Database, DbPool, Role, SystemConfigRepository, UserRepository};
use crate::{FeedflowError, Result};

/// Name given to the default super-admin account.
pub const DEFAULT_ADMIN_NAME: &str = "Default Admin";

/// Default system config entries as `(key, value, description)`.
fn default_entries(config: &Config) -> Vec<(&'static str, String, &'static str)> {
    vec![
        (
            config_keys::OPENAI_BASE_URL,
            config.llm.base_url.clone(),
            "OpenAI compatible API base URL",
        ),
        (
            config_keys::OPENAI_API_KEY,
            config.llm.api_key.clone(),
            "OpenAI compatible API key",
        ),
        (
            config_keys::OPENAI_MODEL,
            config.llm.model.clone(),
            "Completion model name",
        ),
        (
            config_keys::MAX_ITEMS_PER_FEED,
            config_keys::DEFAULT_MAX_ITEMS_PER_FEED.to_string(),
            "Maximum number of items kept per feed",
        ),
        (
            config_keys::REGISTRATION_ENABLED,
            "true".to_string(),
            "Whether new users may register",
        ),
    ]
}

/// Insert missing system config entries. Existing values are kept.
pub async fn seed_system_config(pool: &DbPool, config: &Config) -> Result<usize> {
    let repo = SystemConfigRepository::new(pool);
    let mut created = 0;
    for (key, value, description) in default_entries(config) {
        if repo.insert_if_absent(key, &value, description).await? {
            debug!(key, "System config entry created");
            created += 1;
        }
    }
    Ok(created)
}

/// Create the default super-admin unless one already exists.
///
/// Fails with `Config` when no super-admin exists and no password is
/// configured.
pub async fn ensure_default_admin(pool: &DbPool, config: &Config) -> Result<()> {
    let users = UserRepository::new(pool);
    if users.get_by_email(&config.admin.email).await?.is_some() {
        debug!(email = %config.admin.email, "Default admin already exists");
        return Ok(());
    }

    if config.admin.password.is_empty() {
        if users.count_by_role(Role::SuperAdmin).await? > 0 {
            return Ok(());
        }
        return Err(FeedflowError::Config(
            "no super admin exists and DEFAULT_ADMIN_PASSWORD is not set".to_string(),
        ));
    }

    let request = RegistrationRequest::new(&config.admin.email, &config.admin.password)
        .with_name(DEFAULT_ADMIN_NAME);
    match register_with_role(pool, request, Role::SuperAdmin).await {
        Ok(user) => {
            info!(user_id = user.id, email = %user.email, "Default admin created");
            Ok(())
        }
        // Lost a race with another initializer.
        Err(FeedflowError::Conflict(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Runs initialization at most once.
#[derive(Debug, Default)]
pub struct Initializer {
    done: OnceCell<()>,
}

impl Initializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run initialization, or wait for the run already in progress.
    ///
    /// A failed run is retried by the next caller.
    pub async fn run(&self, db: &Database, config: &Config) -> Result<()> {
        self.done
            .get_or_try_init(|| async {
                info!("Initializing application");
                let created = seed_system_config(db.pool(), config).await?;
                ensure_default_admin(db.pool(), config).await?;
                info!(config_entries_created = created, "Application initialized");
                Ok::<(), FeedflowError>(())
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.done.initialized()
    }
}
