//! Item retention.
//!
//! Each user keeps items for a number of days (`-1` keeps them forever),
//! optionally deleting only read ones. Cleanup runs on demand and from a
//! periodic background sweep.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::db::{Database, DbPool, User, UserRepository, RETENTION_DISABLED};
use crate::feed::ItemRepository;
use crate::{FeedflowError, Result};

/// A user's retention settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSettings {
    pub item_retention_days: i64,
    pub item_retention_only_read: bool,
    pub last_item_cleanup: Option<DateTime<Utc>>,
}

impl From<&User> for RetentionSettings {
    fn from(user: &User) -> Self {
        Self {
            item_retention_days: user.item_retention_days,
            item_retention_only_read: user.item_retention_only_read,
            last_item_cleanup: user.last_item_cleanup,
        }
    }
}

/// What a cleanup would delete right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupPreview {
    pub eligible_count: i64,
    /// `None` when retention is disabled.
    pub cutoff_date: Option<DateTime<Utc>>,
    pub retention_days: i64,
    pub only_read: bool,
}

/// Items created before the returned instant are past retention.
pub fn cutoff(retention_days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(retention_days)
}

async fn load_user(pool: &DbPool, user_id: i64) -> Result<User> {
    UserRepository::new(pool)
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| FeedflowError::NotFound("user".to_string()))
}

/// Get a user's retention settings.
pub async fn settings(pool: &DbPool, user_id: i64) -> Result<RetentionSettings> {
    Ok(RetentionSettings::from(&load_user(pool, user_id).await?))
}

/// Update a user's retention settings.
///
/// `days` must be `-1` (disabled) or non-negative.
pub async fn update_settings(
    pool: &DbPool,
    user_id: i64,
    days: Option<i64>,
    only_read: Option<bool>,
) -> Result<RetentionSettings> {
    if let Some(days) = days {
        if days < RETENTION_DISABLED {
            return Err(FeedflowError::Validation(
                "itemRetentionDays must be -1 (disabled) or a non-negative number".to_string(),
            ));
        }
    }
    UserRepository::new(pool)
        .update_retention(user_id, days, only_read)
        .await?;
    settings(pool, user_id).await
}

/// Count the items a cleanup would delete.
pub async fn preview(pool: &DbPool, user_id: i64) -> Result<CleanupPreview> {
    let user = load_user(pool, user_id).await?;
    if !user.retention_enabled() {
        return Ok(CleanupPreview {
            eligible_count: 0,
            cutoff_date: None,
            retention_days: user.item_retention_days,
            only_read: user.item_retention_only_read,
        });
    }

    let cutoff = cutoff(user.item_retention_days, Utc::now());
    let eligible_count = ItemRepository::new(pool)
        .count_created_before(user_id, cutoff, user.item_retention_only_read)
        .await?;
    Ok(CleanupPreview {
        eligible_count,
        cutoff_date: Some(cutoff),
        retention_days: user.item_retention_days,
        only_read: user.item_retention_only_read,
    })
}

/// Delete the user's items past retention and stamp the cleanup time.
///
/// Fails with `Validation` when retention is disabled.
pub async fn run_cleanup(pool: &DbPool, user_id: i64) -> Result<u64> {
    let user = load_user(pool, user_id).await?;
    if !user.retention_enabled() {
        return Err(FeedflowError::Validation(
            "item cleanup is disabled".to_string(),
        ));
    }
    cleanup_user(pool, &user).await
}

async fn cleanup_user(pool: &DbPool, user: &User) -> Result<u64> {
    let now = Utc::now();
    let deleted = ItemRepository::new(pool)
        .delete_created_before(
            user.id,
            cutoff(user.item_retention_days, now),
            user.item_retention_only_read,
        )
        .await?;
    UserRepository::new(pool).stamp_cleanup(user.id, now).await?;

    if deleted > 0 {
        info!(
            user_id = user.id,
            deleted,
            retention_days = user.item_retention_days,
            "Old items cleaned up"
        );
    }
    Ok(deleted)
}

/// Run cleanup for every user with retention enabled.
///
/// Returns the total number of deleted items. A failing user is logged and
/// skipped.
pub async fn sweep(pool: &DbPool) -> Result<u64> {
    let users = UserRepository::new(pool).list_with_retention().await?;
    let mut total = 0;
    for user in &users {
        match cleanup_user(pool, user).await {
            Ok(deleted) => total += deleted,
            Err(e) => error!(user_id = user.id, error = %e, "Retention cleanup failed"),
        }
    }
    debug!(users = users.len(), deleted = total, "Retention sweep finished");
    Ok(total)
}

/// Periodic retention sweep.
pub struct RetentionSweeper {
    db: Database,
    period: StdDuration,
}

impl RetentionSweeper {
    pub fn new(db: Database, interval_secs: u64) -> Self {
        Self {
            db,
            period: StdDuration::from_secs(interval_secs),
        }
    }

    /// Run the sweep loop forever. The first sweep runs immediately.
    pub async fn run(&self) {
        info!(
            interval_secs = self.period.as_secs(),
            "Retention sweeper started"
        );
        let mut timer = interval(self.period);
        loop {
            timer.tick().await;
            if let Err(e) = sweep(self.db.pool()).await {
                error!(error = %e, "Retention sweep failed");
            }
        }
    }
}

/// Spawn the retention sweeper. An interval of zero disables it.
pub fn start_retention_sweeper(
    db: Database,
    interval_secs: u64,
) -> Option<tokio::task::JoinHandle<()>> {
    if interval_secs == 0 {
        info!("Retention sweeper disabled");
        return None;
    }
    let sweeper = RetentionSweeper::new(db, interval_secs);
    Some(tokio::spawn(async move { sweeper.run().await }))
}
