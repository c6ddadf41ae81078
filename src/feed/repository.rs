//! Feed and item repositories for FeedFlow.

use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;

use super::types::{Feed, FeedUpdate, FeedWithCounts, Item, ItemWithFeed, NewFeed, NewItem};
use crate::datetime::{parse_datetime, to_sql};
use crate::db::DbPool;
use crate::{FeedflowError, Result};

const FEED_COLUMNS: &str = "f.id, f.user_id, f.url, f.title, f.description, f.site_url, f.tags, \
     f.title_filter, f.default_read_status, f.last_fetched_at, f.last_error, f.created_at, \
     f.updated_at";

const ITEM_COLUMNS: &str =
    "i.id, i.feed_id, i.title, i.link, i.description, i.pub_date, i.read, i.created_at";

/// Decode the JSON tag column. Corrupt values read as no tags.
fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Row type for feeds from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    user_id: i64,
    url: String,
    title: String,
    description: Option<String>,
    site_url: Option<String>,
    tags: String,
    title_filter: Option<String>,
    default_read_status: bool,
    last_fetched_at: Option<String>,
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            user_id: row.user_id,
            url: row.url,
            title: row.title,
            description: row.description,
            site_url: row.site_url,
            tags: decode_tags(&row.tags),
            title_filter: row.title_filter,
            default_read_status: row.default_read_status,
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_datetime(&s)),
            last_error: row.last_error,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for feeds with counters.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedWithCountsRow {
    #[sqlx(flatten)]
    feed: FeedRow,
    item_count: i64,
    unread_count: i64,
}

impl From<FeedWithCountsRow> for FeedWithCounts {
    fn from(row: FeedWithCountsRow) -> Self {
        FeedWithCounts {
            feed: row.feed.into(),
            item_count: row.item_count,
            unread_count: row.unread_count,
        }
    }
}

/// Row type for items from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    feed_id: i64,
    title: String,
    link: String,
    description: Option<String>,
    pub_date: String,
    read: bool,
    created_at: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            link: row.link,
            description: row.description,
            pub_date: parse_datetime(&row.pub_date).unwrap_or_else(Utc::now),
            read: row.read,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for items joined with their feed.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemWithFeedRow {
    #[sqlx(flatten)]
    item: ItemRow,
    feed_title: String,
    feed_tags: String,
    feed_title_filter: Option<String>,
}

impl From<ItemWithFeedRow> for ItemWithFeed {
    fn from(row: ItemWithFeedRow) -> Self {
        ItemWithFeed {
            item: row.item.into(),
            feed_title: row.feed_title,
            feed_tags: decode_tags(&row.feed_tags),
            feed_title_filter: row.feed_title_filter,
        }
    }
}

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new FeedRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed.
    ///
    /// The (user, url) pair is unique; a duplicate fails with `Conflict`.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let result = sqlx::query(
            "INSERT INTO feeds (user_id, url, title, description, site_url, title_filter)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, url) DO NOTHING",
        )
        .bind(feed.user_id)
        .bind(&feed.url)
        .bind(&feed.title)
        .bind(&feed.description)
        .bind(&feed.site_url)
        .bind(&feed.title_filter)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(FeedflowError::Conflict("feed already subscribed".to_string()));
        }

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| FeedflowError::NotFound("feed".to_string()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let sql = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = ?");
        let row = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(row.map(Feed::from))
    }

    /// Get a user's feed by URL.
    pub async fn get_by_user_url(&self, user_id: i64, url: &str) -> Result<Option<Feed>> {
        let sql = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.user_id = ? AND f.url = ?");
        let row = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(user_id)
            .bind(url)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(row.map(Feed::from))
    }

    /// List a user's feeds, newest subscription first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Feed>> {
        let sql = format!(
            "SELECT {FEED_COLUMNS} FROM feeds f WHERE f.user_id = ?
             ORDER BY f.created_at DESC, f.id DESC"
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// List a user's feeds ordered by title.
    pub async fn list_by_user_by_title(&self, user_id: i64) -> Result<Vec<Feed>> {
        let sql = format!(
            "SELECT {FEED_COLUMNS} FROM feeds f WHERE f.user_id = ?
             ORDER BY f.title COLLATE NOCASE ASC, f.id ASC"
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// List a user's feeds with item and unread counts.
    pub async fn list_with_counts(&self, user_id: i64) -> Result<Vec<FeedWithCounts>> {
        let sql = format!(
            "SELECT {FEED_COLUMNS},
                    (SELECT COUNT(*) FROM items i WHERE i.feed_id = f.id) AS item_count,
                    (SELECT COUNT(*) FROM items i WHERE i.feed_id = f.id AND i.read = 0) AS unread_count
             FROM feeds f WHERE f.user_id = ?
             ORDER BY f.created_at DESC, f.id DESC"
        );
        let rows = sqlx::query_as::<_, FeedWithCountsRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(FeedWithCounts::from).collect())
    }

    /// Update a feed. Returns `false` if nothing changed.
    pub async fn update(&self, id: i64, update: &FeedUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE feeds SET ");
        let mut separated = query.separated(", ");

        if let Some(ref tags) = update.tags {
            separated.push("tags = ");
            separated.push_bind_unseparated(encode_tags(tags));
        }

        if let Some(read) = update.default_read_status {
            separated.push("default_read_status = ");
            separated.push_bind_unseparated(read);
        }

        if let Some(ref filter) = update.title_filter {
            separated.push("title_filter = ");
            separated.push_bind_unseparated(filter.clone());
        }

        separated.push("updated_at = datetime('now')");

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace a feed's tags.
    pub async fn set_tags(&self, id: i64, tags: &[String]) -> Result<()> {
        sqlx::query("UPDATE feeds SET tags = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(encode_tags(tags))
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a feed. Its items are removed by cascade.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful fetch.
    pub async fn mark_fetched(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE feeds SET last_fetched_at = datetime('now'), last_error = NULL WHERE id = ?",
        )
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(())
    }

    /// Record a failed fetch.
    pub async fn record_error(&self, id: i64, error: &str) -> Result<()> {
        sqlx::query("UPDATE feeds SET last_error = ? WHERE id = ?")
            .bind(error)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Repository for item operations.
pub struct ItemRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new ItemRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert an item unless one with the same (feed, link) exists.
    ///
    /// Returns the new ID, or `None` if the item was already stored.
    pub async fn create_or_ignore(&self, item: &NewItem) -> Result<Option<i64>> {
        let result = sqlx::query(
            "INSERT INTO items (feed_id, title, link, description, pub_date, read)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(feed_id, link) DO NOTHING",
        )
        .bind(item.feed_id)
        .bind(&item.title)
        .bind(&item.link)
        .bind(&item.description)
        .bind(to_sql(&item.pub_date))
        .bind(item.read)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            Ok(None)
        } else {
            Ok(Some(result.last_insert_rowid()))
        }
    }

    /// Get an item by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ?");
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(row.map(Item::from))
    }

    /// List the latest items of a feed.
    pub async fn list_latest_by_feed(&self, feed_id: i64, limit: i64) -> Result<Vec<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items i WHERE i.feed_id = ?
             ORDER BY i.pub_date DESC, i.id DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(feed_id)
            .bind(limit)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// Count items of a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE feed_id = ?")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))
    }

    /// List a user's items with their feed details, newest first.
    ///
    /// Filters are optional; pagination is left to the caller because the
    /// feeds' title filters are applied after the query.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        feed_id: Option<i64>,
        tag: Option<&str>,
        read: Option<bool>,
    ) -> Result<Vec<ItemWithFeed>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
            "SELECT {ITEM_COLUMNS}, f.title AS feed_title, f.tags AS feed_tags,
                    f.title_filter AS feed_title_filter
             FROM items i JOIN feeds f ON f.id = i.feed_id
             WHERE f.user_id = "
        ));
        query.push_bind(user_id);

        if let Some(feed_id) = feed_id {
            query.push(" AND i.feed_id = ");
            query.push_bind(feed_id);
        }
        if let Some(tag) = tag {
            query.push(" AND EXISTS (SELECT 1 FROM json_each(f.tags) WHERE json_each.value = ");
            query.push_bind(tag.to_string());
            query.push(")");
        }
        if let Some(read) = read {
            query.push(" AND i.read = ");
            query.push_bind(read);
        }
        query.push(" ORDER BY i.pub_date DESC, i.id DESC");

        let rows = query
            .build_query_as::<ItemWithFeedRow>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(ItemWithFeed::from).collect())
    }

    /// Get one item with its feed details.
    pub async fn get_with_feed(&self, id: i64) -> Result<Option<(ItemWithFeed, i64)>> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            inner: ItemWithFeedRow,
            owner_id: i64,
        }

        let sql = format!(
            "SELECT {ITEM_COLUMNS}, f.title AS feed_title, f.tags AS feed_tags,
                    f.title_filter AS feed_title_filter, f.user_id AS owner_id
             FROM items i JOIN feeds f ON f.id = i.feed_id
             WHERE i.id = ?"
        );
        let row = sqlx::query_as::<_, Row>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(row.map(|r| (r.inner.into(), r.owner_id)))
    }

    /// Set the read flag of an item.
    pub async fn set_read(&self, id: i64, read: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE items SET read = ? WHERE id = ?")
            .bind(read)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a user's unread items read, optionally limited to one feed or tag.
    ///
    /// Returns the number of items changed.
    pub async fn mark_all_read(
        &self,
        user_id: i64,
        feed_id: Option<i64>,
        tag: Option<&str>,
    ) -> Result<u64> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "UPDATE items SET read = 1 WHERE read = 0 AND feed_id IN (SELECT f.id FROM feeds f WHERE f.user_id = ",
        );
        query.push_bind(user_id);
        if let Some(feed_id) = feed_id {
            query.push(" AND f.id = ");
            query.push_bind(feed_id);
        }
        if let Some(tag) = tag {
            query.push(" AND EXISTS (SELECT 1 FROM json_each(f.tags) WHERE json_each.value = ");
            query.push_bind(tag.to_string());
            query.push(")");
        }
        query.push(")");

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Count a user's unread items published at or after `since`.
    pub async fn count_unread_since(&self, user_id: i64, since: DateTime<Utc>) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM items i JOIN feeds f ON f.id = i.feed_id
             WHERE f.user_id = ? AND i.read = 0 AND i.pub_date >= ?",
        )
        .bind(user_id)
        .bind(to_sql(&since))
        .fetch_one(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))
    }

    /// List a user's unread items published at or after `since`, newest first.
    pub async fn list_unread_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ItemWithFeed>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS}, f.title AS feed_title, f.tags AS feed_tags,
                    f.title_filter AS feed_title_filter
             FROM items i JOIN feeds f ON f.id = i.feed_id
             WHERE f.user_id = ? AND i.read = 0 AND i.pub_date >= ?
             ORDER BY i.pub_date DESC, i.id DESC
             LIMIT ?"
        );
        let rows = sqlx::query_as::<_, ItemWithFeedRow>(&sql)
            .bind(user_id)
            .bind(to_sql(&since))
            .bind(limit)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(ItemWithFeed::from).collect())
    }

    /// Count a user's items created before `cutoff` (read ones only if `only_read`).
    pub async fn count_created_before(
        &self,
        user_id: i64,
        cutoff: DateTime<Utc>,
        only_read: bool,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM items
             WHERE feed_id IN (SELECT id FROM feeds WHERE user_id = ?)
               AND created_at < ?
               AND (? = 0 OR read = 1)",
        )
        .bind(user_id)
        .bind(to_sql(&cutoff))
        .bind(only_read)
        .fetch_one(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))
    }

    /// Delete a user's items created before `cutoff` (read ones only if `only_read`).
    pub async fn delete_created_before(
        &self,
        user_id: i64,
        cutoff: DateTime<Utc>,
        only_read: bool,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM items
             WHERE feed_id IN (SELECT id FROM feeds WHERE user_id = ?)
               AND created_at < ?
               AND (? = 0 OR read = 1)",
        )
        .bind(user_id)
        .bind(to_sql(&cutoff))
        .bind(only_read)
        .execute(self.pool)
        .await
        .map_err(|e| FeedflowError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};
    use chrono::Duration;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("reader@example.com", "hash"))
            .await
            .unwrap();
        (db, user.id)
    }

    async fn create_feed(db: &Database, user_id: i64, url: &str) -> Feed {
        FeedRepository::new(db.pool())
            .create(&NewFeed::new(user_id, url, "Feed"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_feed_and_conflict() {
        let (db, user_id) = setup().await;
        let repo = FeedRepository::new(db.pool());

        let feed = repo
            .create(&NewFeed::new(user_id, "https://example.com/rss", "Example"))
            .await
            .unwrap();
        assert_eq!(feed.user_id, user_id);
        assert!(feed.tags.is_empty());
        assert!(!feed.default_read_status);

        let dup = repo
            .create(&NewFeed::new(user_id, "https://example.com/rss", "Again"))
            .await;
        assert!(matches!(dup, Err(FeedflowError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_feed() {
        let (db, user_id) = setup().await;
        let feed = create_feed(&db, user_id, "https://example.com/rss").await;
        let repo = FeedRepository::new(db.pool());

        assert!(!repo.update(feed.id, &FeedUpdate::new()).await.unwrap());

        let update = FeedUpdate::new()
            .tags(vec!["tech".to_string(), "news".to_string()])
            .default_read_status(true)
            .title_filter(Some("^Ad".to_string()));
        assert!(repo.update(feed.id, &update).await.unwrap());

        let feed = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert_eq!(feed.tags, vec!["tech", "news"]);
        assert!(feed.default_read_status);
        assert_eq!(feed.title_filter.as_deref(), Some("^Ad"));

        repo.update(feed.id, &FeedUpdate::new().title_filter(None))
            .await
            .unwrap();
        let feed = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert!(feed.title_filter.is_none());
        assert_eq!(feed.tags, vec!["tech", "news"]);
    }

    #[tokio::test]
    async fn test_create_or_ignore_dedups_on_link() {
        let (db, user_id) = setup().await;
        let feed = create_feed(&db, user_id, "https://example.com/rss").await;
        let repo = ItemRepository::new(db.pool());

        let item = NewItem::new(feed.id, "First", "https://example.com/1");
        assert!(repo.create_or_ignore(&item).await.unwrap().is_some());
        let again = NewItem::new(feed.id, "First (edited)", "https://example.com/1");
        assert!(repo.create_or_ignore(&again).await.unwrap().is_none());
        assert_eq!(repo.count_by_feed(feed.id).await.unwrap(), 1);

        // Same link in another feed is a different item
        let other = create_feed(&db, user_id, "https://example.org/rss").await;
        let item = NewItem::new(other.id, "First", "https://example.com/1");
        assert!(repo.create_or_ignore(&item).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_feed_cascades() {
        let (db, user_id) = setup().await;
        let feed = create_feed(&db, user_id, "https://example.com/rss").await;
        let items = ItemRepository::new(db.pool());
        let id = items
            .create_or_ignore(&NewItem::new(feed.id, "A", "https://example.com/a"))
            .await
            .unwrap()
            .unwrap();

        assert!(FeedRepository::new(db.pool()).delete(feed.id).await.unwrap());
        assert!(items.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_with_counts() {
        let (db, user_id) = setup().await;
        let feed = create_feed(&db, user_id, "https://example.com/rss").await;
        let items = ItemRepository::new(db.pool());
        let a = items
            .create_or_ignore(&NewItem::new(feed.id, "A", "https://example.com/a"))
            .await
            .unwrap()
            .unwrap();
        items
            .create_or_ignore(&NewItem::new(feed.id, "B", "https://example.com/b"))
            .await
            .unwrap();
        items.set_read(a, true).await.unwrap();

        let feeds = FeedRepository::new(db.pool())
            .list_with_counts(user_id)
            .await
            .unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].item_count, 2);
        assert_eq!(feeds[0].unread_count, 1);
    }

    #[tokio::test]
    async fn test_list_for_user_filters() {
        let (db, user_id) = setup().await;
        let tech = create_feed(&db, user_id, "https://tech.example.com/rss").await;
        let other = create_feed(&db, user_id, "https://other.example.com/rss").await;
        FeedRepository::new(db.pool())
            .set_tags(tech.id, &["tech".to_string()])
            .await
            .unwrap();

        let items = ItemRepository::new(db.pool());
        let now = Utc::now();
        let t1 = items
            .create_or_ignore(
                &NewItem::new(tech.id, "T1", "https://tech.example.com/1")
                    .with_pub_date(now - Duration::hours(2)),
            )
            .await
            .unwrap()
            .unwrap();
        items
            .create_or_ignore(
                &NewItem::new(tech.id, "T2", "https://tech.example.com/2")
                    .with_pub_date(now - Duration::hours(1)),
            )
            .await
            .unwrap();
        items
            .create_or_ignore(&NewItem::new(other.id, "O1", "https://other.example.com/1"))
            .await
            .unwrap();
        items.set_read(t1, true).await.unwrap();

        let all = items.list_for_user(user_id, None, None, None).await.unwrap();
        let titles: Vec<_> = all.iter().map(|i| i.item.title.as_str()).collect();
        assert_eq!(titles, vec!["O1", "T2", "T1"]);

        let tagged = items
            .list_for_user(user_id, None, Some("tech"), None)
            .await
            .unwrap();
        assert_eq!(tagged.len(), 2);
        assert!(tagged.iter().all(|i| i.feed_tags == vec!["tech"]));

        let unread = items
            .list_for_user(user_id, Some(tech.id), None, Some(false))
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].item.title, "T2");
    }

    #[tokio::test]
    async fn test_mark_all_read_scopes() {
        let (db, user_id) = setup().await;
        let a = create_feed(&db, user_id, "https://a.example.com/rss").await;
        let b = create_feed(&db, user_id, "https://b.example.com/rss").await;
        FeedRepository::new(db.pool())
            .set_tags(b.id, &["news".to_string()])
            .await
            .unwrap();
        let items = ItemRepository::new(db.pool());
        for (feed, n) in [(&a, 2), (&b, 3)] {
            for i in 0..n {
                items
                    .create_or_ignore(&NewItem::new(feed.id, "x", format!("{}/{i}", feed.url)))
                    .await
                    .unwrap();
            }
        }

        assert_eq!(items.mark_all_read(user_id, None, Some("news")).await.unwrap(), 3);
        assert_eq!(items.mark_all_read(user_id, Some(a.id), None).await.unwrap(), 2);
        assert_eq!(items.mark_all_read(user_id, None, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unread_since() {
        let (db, user_id) = setup().await;
        let feed = create_feed(&db, user_id, "https://example.com/rss").await;
        let items = ItemRepository::new(db.pool());
        let now = Utc::now();
        items
            .create_or_ignore(
                &NewItem::new(feed.id, "Old", "https://example.com/old")
                    .with_pub_date(now - Duration::hours(30)),
            )
            .await
            .unwrap();
        items
            .create_or_ignore(
                &NewItem::new(feed.id, "Fresh", "https://example.com/fresh")
                    .with_pub_date(now - Duration::hours(1)),
            )
            .await
            .unwrap();

        let since = now - Duration::hours(24);
        assert_eq!(items.count_unread_since(user_id, since).await.unwrap(), 1);
        let unread = items.list_unread_since(user_id, since, 100).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].item.title, "Fresh");
    }

    #[tokio::test]
    async fn test_cleanup_queries() {
        let (db, user_id) = setup().await;
        let feed = create_feed(&db, user_id, "https://example.com/rss").await;
        let items = ItemRepository::new(db.pool());
        let read_id = items
            .create_or_ignore(&NewItem::new(feed.id, "R", "https://example.com/r"))
            .await
            .unwrap()
            .unwrap();
        items
            .create_or_ignore(&NewItem::new(feed.id, "U", "https://example.com/u"))
            .await
            .unwrap();
        items.set_read(read_id, true).await.unwrap();

        let past = Utc::now() - Duration::days(1);
        assert_eq!(items.count_created_before(user_id, past, false).await.unwrap(), 0);

        let future = Utc::now() + Duration::days(1);
        assert_eq!(items.count_created_before(user_id, future, true).await.unwrap(), 1);
        assert_eq!(items.count_created_before(user_id, future, false).await.unwrap(), 2);
        assert_eq!(items.delete_created_before(user_id, future, true).await.unwrap(), 1);
        assert_eq!(items.count_by_feed(feed.id).await.unwrap(), 1);
    }
}
