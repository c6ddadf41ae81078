//! Configuration module for FeedFlow.

use serde::Deserialize;
use std::path::Path;

use crate::{FeedflowError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins (empty allows any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Secret used to sign access tokens.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_jwt_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Login/registration attempts per minute per client IP.
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_jwt_expiry() -> u64 {
    7 * 24 * 3600
}

fn default_login_rate_limit() -> u32 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_expiry(),
            login_rate_limit: default_login_rate_limit(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedflow.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path. Empty disables file output.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedflow.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Feed fetching and background work configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Total request timeout for a feed fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Maximum number of redirects followed.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum accepted response size.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Allow feeds on loopback/private addresses.
    #[serde(default)]
    pub allow_private_hosts: bool,
    /// Feeds fetched concurrently by a refresh-all task.
    #[serde(default = "default_refresh_concurrency")]
    pub refresh_concurrency: usize,
    /// Background tasks allowed to run at once.
    #[serde(default = "default_max_background_tasks")]
    pub max_background_tasks: usize,
    /// Interval of the retention sweep. Zero disables it.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_refresh_concurrency() -> usize {
    5
}

fn default_max_background_tasks() -> usize {
    4
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            allow_private_hosts: false,
            refresh_concurrency: default_refresh_concurrency(),
            max_background_tasks: default_max_background_tasks(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Initial values for the completion API system config entries.
///
/// These only seed the `system_config` table on first start; the stored
/// values are what the running service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    /// Timeout for non-streaming completion calls.
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

/// Default administrator account.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_email")]
    pub email: String,
    /// Password for the default super-admin, usually supplied via
    /// `DEFAULT_ADMIN_PASSWORD`.
    #[serde(default)]
    pub password: String,
}

fn default_admin_email() -> String {
    "admin@feedflow.local".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: default_admin_email(),
            password: String::new(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedflowError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a file and apply environment overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedflowError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides.
    ///
    /// Empty variables are ignored.
    pub fn apply_env_overrides(&mut self) {
        let vars: [(&str, &mut String); 6] = [
            ("FEEDFLOW_JWT_SECRET", &mut self.server.jwt_secret),
            ("FEEDFLOW_DATABASE_PATH", &mut self.database.path),
            ("OPENAI_BASE_URL", &mut self.llm.base_url),
            ("OPENAI_API_KEY", &mut self.llm.api_key),
            ("OPENAI_MODEL", &mut self.llm.model),
            ("DEFAULT_ADMIN_PASSWORD", &mut self.admin.password),
        ];
        for (name, slot) in vars {
            if let Ok(value) = std::env::var(name) {
                if !value.is_empty() {
                    *slot = value;
                }
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.jwt_secret.is_empty() {
            return Err(FeedflowError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via FEEDFLOW_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.feed.refresh_concurrency == 0 || self.feed.max_background_tasks == 0 {
            return Err(FeedflowError::Config(
                "refresh_concurrency and max_background_tasks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
