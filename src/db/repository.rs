//! User repository for FeedFlow.

use chrono::{DateTime, Utc};

use super::user::{NewUser, Role, SummaryLanguage, User};
use super::DbPool;
use crate::datetime::{parse_datetime, to_sql};
use crate::{FeedflowError, Result};

const USER_COLUMNS: &str = "id, email, password, name, role, summary_language, \
     item_retention_days, item_retention_only_read, last_item_cleanup, created_at";

/// Row type for users from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password: String,
    name: Option<String>,
    role: String,
    summary_language: String,
    item_retention_days: i64,
    item_retention_only_read: bool,
    last_item_cleanup: Option<String>,
    created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password: row.password,
            name: row.name,
            role: row.role.parse().unwrap_or_default(),
            summary_language: row.summary_language.parse().unwrap_or_default(),
            item_retention_days: row.item_retention_days,
            item_retention_only_read: row.item_retention_only_read,
            last_item_cleanup: row.last_item_cleanup.and_then(|s| parse_datetime(&s)),
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// Fails with `Conflict` if the email is already registered.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (email, password, name, role) VALUES (?, ?, ?, ?)
             ON CONFLICT(email) DO NOTHING",
        )
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(&new_user.name)
        .bind(new_user.role.as_str())
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(FeedflowError::Conflict(format!(
                "email {} is already registered",
                new_user.email
            )));
        }

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| FeedflowError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(row.map(User::from))
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(row.map(User::from))
    }

    /// List all users, oldest first.
    pub async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Count users holding the given role.
    pub async fn count_by_role(&self, role: Role) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))
    }

    /// Change a user's role.
    pub async fn update_role(&self, id: i64, role: Role) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the digest language preference.
    pub async fn update_summary_language(&self, id: i64, language: SummaryLanguage) -> Result<()> {
        sqlx::query("UPDATE users SET summary_language = ? WHERE id = ?")
            .bind(language.as_str())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(())
    }

    /// Update retention settings. `None` leaves a field unchanged.
    pub async fn update_retention(
        &self,
        id: i64,
        days: Option<i64>,
        only_read: Option<bool>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET
                item_retention_days = COALESCE(?, item_retention_days),
                item_retention_only_read = COALESCE(?, item_retention_only_read)
             WHERE id = ?",
        )
        .bind(days)
        .bind(only_read)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(())
    }

    /// Record when retention cleanup last ran.
    pub async fn stamp_cleanup(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_item_cleanup = ? WHERE id = ?")
            .bind(to_sql(&at))
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(())
    }

    /// List users whose retention policy is enabled.
    pub async fn list_with_retention(&self) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE item_retention_days >= 0 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
