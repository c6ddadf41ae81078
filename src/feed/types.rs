//! Feed and item types for FeedFlow.

use chrono::{DateTime, Utc};

/// Maximum stored length of an item description, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 10000;

/// Maximum length of a single tag.
pub const MAX_TAG_LENGTH: usize = 50;

/// Default page size for item listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest accepted page size for item listings.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A subscribed feed.
#[derive(Debug, Clone)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Feed URL (unique per user).
    pub url: String,
    /// Feed title.
    pub title: String,
    /// Feed description.
    pub description: Option<String>,
    /// Website the feed belongs to.
    pub site_url: Option<String>,
    /// Free-text tags, in insertion order.
    pub tags: Vec<String>,
    /// Optional case-insensitive pattern; matching titles are not ingested.
    pub title_filter: Option<String>,
    /// Read flag given to newly ingested items.
    pub default_read_status: bool,
    /// Last successful fetch.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Last fetch error message.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feed {
    /// Whether the feed carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A feed with item counters, as listed to its owner.
#[derive(Debug, Clone)]
pub struct FeedWithCounts {
    pub feed: Feed,
    pub item_count: i64,
    pub unread_count: i64,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub user_id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub title_filter: Option<String>,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(user_id: i64, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            user_id,
            url: url.into(),
            title: title.into(),
            description: None,
            site_url: None,
            title_filter: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the site URL.
    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = Some(site_url.into());
        self
    }

    /// Set the title filter. Blank patterns are dropped.
    pub fn with_title_filter(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.title_filter = if pattern.trim().is_empty() {
            None
        } else {
            Some(pattern)
        };
        self
    }
}

/// Feed update request. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct FeedUpdate {
    pub tags: Option<Vec<String>>,
    pub default_read_status: Option<bool>,
    /// `Some(None)` clears the filter.
    pub title_filter: Option<Option<String>>,
}

impl FeedUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tags.
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Set the default read status.
    pub fn default_read_status(mut self, read: bool) -> Self {
        self.default_read_status = Some(read);
        self
    }

    /// Set or clear the title filter. Blank patterns clear it.
    pub fn title_filter(mut self, pattern: Option<String>) -> Self {
        self.title_filter = Some(pattern.filter(|p| !p.trim().is_empty()));
        self
    }

    /// Check if the update has no changes.
    pub fn is_empty(&self) -> bool {
        self.tags.is_none() && self.default_read_status.is_none() && self.title_filter.is_none()
    }
}

/// A stored article.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    /// Link (unique within the feed).
    pub link: String,
    pub description: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// An article together with details of its feed.
#[derive(Debug, Clone)]
pub struct ItemWithFeed {
    pub item: Item,
    pub feed_title: String,
    pub feed_tags: Vec<String>,
    pub feed_title_filter: Option<String>,
}

/// New article for insertion.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub read: bool,
}

impl NewItem {
    /// Create a new item published now.
    pub fn new(feed_id: i64, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            feed_id,
            title: title.into(),
            link: link.into(),
            description: None,
            pub_date: Utc::now(),
            read: false,
        }
    }

    /// Set the description, truncated to [`MAX_DESCRIPTION_LENGTH`] characters.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let desc = description.into();
        self.description = Some(if desc.chars().count() > MAX_DESCRIPTION_LENGTH {
            desc.chars().take(MAX_DESCRIPTION_LENGTH).collect()
        } else {
            desc
        });
        self
    }

    /// Set the publish date.
    pub fn with_pub_date(mut self, pub_date: DateTime<Utc>) -> Self {
        self.pub_date = pub_date;
        self
    }

    /// Set the initial read flag.
    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }
}

/// Filters for listing a user's items.
#[derive(Debug, Clone)]
pub struct ItemQuery {
    pub feed_id: Option<i64>,
    pub tag: Option<String>,
    pub read: Option<bool>,
    /// 1-based page number.
    pub page: i64,
    pub limit: i64,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            feed_id: None,
            tag: None,
            read: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ItemQuery {
    /// Page number, at least 1.
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn per_page(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// Row offset for the requested page. Saturates instead of overflowing.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

/// Normalized feed as returned by the parser adapter.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub items: Vec<ParsedItem>,
}

/// Normalized feed entry.
#[derive(Debug, Clone)]
pub struct ParsedItem {
    /// Entry identifier (GUID or Atom id).
    pub guid: String,
    /// Title, `None` when missing or blank.
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl ParsedItem {
    /// Deduplication key: the link, or the GUID when the entry has no link.
    pub fn dedup_link(&self) -> &str {
        self.link
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.guid)
    }
}

/// Result of refreshing one feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Articles inserted.
    pub new_items: usize,
    /// Entries dropped by the title filter.
    pub filtered_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feed_builder() {
        let feed = NewFeed::new(1, "https://example.com/rss", "Example")
            .with_description("desc")
            .with_site_url("https://example.com")
            .with_title_filter("^Sale$");
        assert_eq!(feed.user_id, 1);
        assert_eq!(feed.description.as_deref(), Some("desc"));
        assert_eq!(feed.title_filter.as_deref(), Some("^Sale$"));
    }

    #[test]
    fn test_new_feed_blank_filter_dropped() {
        let feed = NewFeed::new(1, "u", "t").with_title_filter("   ");
        assert!(feed.title_filter.is_none());
    }

    #[test]
    fn test_feed_update_empty() {
        assert!(FeedUpdate::new().is_empty());
        assert!(!FeedUpdate::new().default_read_status(true).is_empty());
    }

    #[test]
    fn test_feed_update_clear_filter() {
        let update = FeedUpdate::new().title_filter(Some(String::new()));
        assert_eq!(update.title_filter, Some(None));

        let update = FeedUpdate::new().title_filter(Some("ad".to_string()));
        assert_eq!(update.title_filter, Some(Some("ad".to_string())));
    }

    #[test]
    fn test_new_item_truncates_long_description() {
        let long = "あ".repeat(MAX_DESCRIPTION_LENGTH + 10);
        let item = NewItem::new(1, "title", "https://example.com/1").with_description(long);
        assert_eq!(
            item.description.unwrap().chars().count(),
            MAX_DESCRIPTION_LENGTH
        );
    }

    #[test]
    fn test_item_query_offset() {
        let mut query = ItemQuery::default();
        assert_eq!(query.offset(), 0);
        query.page = 3;
        query.limit = 20;
        assert_eq!(query.offset(), 40);
        query.page = 0;
        assert_eq!(query.offset(), 0);

        query.page = i64::MAX;
        assert_eq!(query.offset(), i64::MAX);
        query.limit = 10_000;
        assert_eq!(query.per_page(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_dedup_link_falls_back_to_guid() {
        let mut item = ParsedItem {
            guid: "guid-1".to_string(),
            title: Some("t".to_string()),
            link: None,
            description: None,
            published_at: None,
        };
        assert_eq!(item.dedup_link(), "guid-1");
        item.link = Some("https://example.com/1".to_string());
        assert_eq!(item.dedup_link(), "https://example.com/1");
    }
}
