//! Key/value system configuration managed by administrators.
//!
//! Values are read on every use; nothing here is cached.

use chrono::Utc;

use super::DbPool;
use crate::datetime::parse_datetime;
use crate::{FeedflowError, Result};

/// Well-known configuration keys.
pub mod config_keys {
    pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
    pub const MAX_ITEMS_PER_FEED: &str = "max_items_per_feed";
    pub const REGISTRATION_ENABLED: &str = "REGISTRATION_ENABLED";

    /// Keys that administrators may edit.
    pub const ALL: &[&str] = &[
        OPENAI_BASE_URL,
        OPENAI_API_KEY,
        OPENAI_MODEL,
        MAX_ITEMS_PER_FEED,
        REGISTRATION_ENABLED,
    ];

    /// Fallback for `max_items_per_feed` when unset or unparsable.
    pub const DEFAULT_MAX_ITEMS_PER_FEED: i64 = 100;
}

/// A stored configuration entry.
#[derive(Debug, Clone)]
pub struct SystemConfigEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SystemConfigRow {
    key: String,
    value: String,
    description: Option<String>,
    updated_at: String,
}

impl From<SystemConfigRow> for SystemConfigEntry {
    fn from(row: SystemConfigRow) -> Self {
        SystemConfigEntry {
            key: row.key,
            value: row.value,
            description: row.description,
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for the `system_config` table.
pub struct SystemConfigRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SystemConfigRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a value by key.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM system_config WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))
    }

    /// Get a value, treating missing and empty values alike.
    pub async fn get_non_empty(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(key)
            .await?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    /// Get a boolean flag, `default` when missing or unparsable.
    pub async fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(match self.get(key).await? {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => default,
        })
    }

    /// Maximum number of items retained per feed.
    pub async fn max_items_per_feed(&self) -> Result<i64> {
        Ok(self
            .get(config_keys::MAX_ITEMS_PER_FEED)
            .await?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(config_keys::DEFAULT_MAX_ITEMS_PER_FEED))
    }

    /// Insert or replace a value.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO system_config (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(())
    }

    /// Insert a value only if the key is absent.
    ///
    /// Returns `true` when a row was created.
    pub async fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
        description: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO system_config (key, value, description) VALUES (?, ?, ?)
             ON CONFLICT(key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// List all entries ordered by key.
    pub async fn list(&self) -> Result<Vec<SystemConfigEntry>> {
        let rows = sqlx::query_as::<_, SystemConfigRow>(
            "SELECT key, value, description, updated_at FROM system_config ORDER BY key",
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(SystemConfigEntry::from).collect())
    }
}
