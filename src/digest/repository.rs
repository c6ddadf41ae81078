//! Daily summary storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::datetime::{date_to_sql, parse_date, parse_datetime};
use crate::db::{DbPool, SummaryLanguage};
use crate::{FeedflowError, Result};

/// A stored digest. At most one exists per user and day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub id: i64,
    pub user_id: i64,
    /// UTC calendar day the digest belongs to.
    pub date: NaiveDate,
    pub content: String,
    pub language: SummaryLanguage,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Digest to be stored.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub user_id: i64,
    pub date: NaiveDate,
    pub content: String,
    pub language: SummaryLanguage,
    pub item_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SummaryRow {
    id: i64,
    user_id: i64,
    summary_date: String,
    content: String,
    language: String,
    item_count: i64,
    created_at: String,
    updated_at: String,
}

impl From<SummaryRow> for DailySummary {
    fn from(row: SummaryRow) -> Self {
        DailySummary {
            id: row.id,
            user_id: row.user_id,
            date: parse_date(&row.summary_date).unwrap_or_else(|| Utc::now().date_naive()),
            content: row.content,
            language: row.language.parse().unwrap_or_default(),
            item_count: row.item_count,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for daily summaries.
pub struct SummaryRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SummaryRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get the user's summary for a day.
    pub async fn get(&self, user_id: i64, date: NaiveDate) -> Result<Option<DailySummary>> {
        let row = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, user_id, summary_date, content, language, item_count, created_at, updated_at
             FROM daily_summaries WHERE user_id = ? AND summary_date = ?",
        )
        .bind(user_id)
        .bind(date_to_sql(&date))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(row.map(DailySummary::from))
    }

    /// Insert a summary unless one exists for the day.
    ///
    /// Returns `None` when the day already has a summary.
    pub async fn insert(&self, summary: &NewSummary) -> Result<Option<DailySummary>> {
        let result = sqlx::query(
            "INSERT INTO daily_summaries (user_id, summary_date, content, language, item_count)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_id, summary_date) DO NOTHING",
        )
        .bind(summary.user_id)
        .bind(date_to_sql(&summary.date))
        .bind(&summary.content)
        .bind(summary.language.as_str())
        .bind(summary.item_count)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(summary.user_id, summary.date).await
    }

    /// Insert a summary, overwriting content, language, and count of an
    /// existing one for the same day.
    pub async fn upsert(&self, summary: &NewSummary) -> Result<DailySummary> {
        sqlx::query(
            "INSERT INTO daily_summaries (user_id, summary_date, content, language, item_count)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_id, summary_date) DO UPDATE SET
                content = excluded.content,
                language = excluded.language,
                item_count = excluded.item_count,
                updated_at = datetime('now')",
        )
        .bind(summary.user_id)
        .bind(date_to_sql(&summary.date))
        .bind(&summary.content)
        .bind(summary.language.as_str())
        .bind(summary.item_count)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;

        self.get(summary.user_id, summary.date)
            .await?
            .ok_or_else(|| FeedflowError::NotFound("summary".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("reader@example.com", "hash"))
            .await
            .unwrap();
        (db, user.id)
    }

    fn summary(user_id: i64, date: NaiveDate, content: &str) -> NewSummary {
        NewSummary {
            user_id,
            date,
            content: content.to_string(),
            language: SummaryLanguage::Zh,
            item_count: 3,
        }
    }

    #[tokio::test]
    async fn test_insert_once_per_day() {
        let (db, user_id) = setup().await;
        let repo = SummaryRepository::new(db.pool());
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let first = repo.insert(&summary(user_id, day, "first")).await.unwrap().unwrap();
        assert_eq!(first.content, "first");
        assert_eq!(first.date, day);

        assert!(repo.insert(&summary(user_id, day, "second")).await.unwrap().is_none());
        assert_eq!(repo.get(user_id, day).await.unwrap().unwrap().content, "first");

        let next_day = day.succ_opt().unwrap();
        let other = repo.insert(&summary(user_id, next_day, "next")).await.unwrap().unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_in_place() {
        let (db, user_id) = setup().await;
        let repo = SummaryRepository::new(db.pool());
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let first = repo.insert(&summary(user_id, day, "first")).await.unwrap().unwrap();

        let mut update = summary(user_id, day, "rewritten");
        update.language = SummaryLanguage::En;
        update.item_count = 7;
        let updated = repo.upsert(&update).await.unwrap();

        assert_eq!(updated.id, first.id);
        assert_eq!(updated.content, "rewritten");
        assert_eq!(updated.language, SummaryLanguage::En);
        assert_eq!(updated.item_count, 7);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (db, user_id) = setup().await;
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(SummaryRepository::new(db.pool())
            .get(user_id, day)
            .await
            .unwrap()
            .is_none());
    }
}
