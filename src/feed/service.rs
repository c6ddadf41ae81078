//! Feed service for FeedFlow.
//!
//! Subscription, refresh, and item listing with ownership checks. Every
//! operation is scoped to the acting user.

use std::collections::HashMap;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::fetcher::{validate_url, FeedFetcher};
use super::filter::TitleFilter;
use super::repository::{FeedRepository, ItemRepository};
use super::types::{
    Feed, FeedUpdate, FeedWithCounts, Item, ItemQuery, ItemWithFeed, NewFeed, NewItem, ParsedFeed,
    RefreshOutcome,
};
use crate::db::{Database, SystemConfigRepository};
use crate::{FeedflowError, Result};

/// Request to subscribe to a feed.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub url: String,
    pub title_filter: Option<String>,
}

impl SubscribeRequest {
    /// Create a subscribe request for a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title_filter: None,
        }
    }

    /// Set a title filter.
    pub fn with_title_filter(mut self, pattern: impl Into<String>) -> Self {
        self.title_filter = Some(pattern.into());
        self
    }
}

/// One page of items.
#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<ItemWithFeed>,
    pub page: i64,
    pub per_page: i64,
    /// Matching items across all pages, after title filtering.
    pub total: i64,
}

/// Totals of a fan-out refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshAllReport {
    pub refreshed: usize,
    pub failed: usize,
    pub new_items: usize,
}

/// Service for feed and item operations.
pub struct FeedService<'a> {
    db: &'a Database,
    fetcher: &'a FeedFetcher,
}

impl<'a> FeedService<'a> {
    /// Create a new FeedService.
    pub fn new(db: &'a Database, fetcher: &'a FeedFetcher) -> Self {
        Self { db, fetcher }
    }

    /// Subscribe the user to a feed.
    ///
    /// The feed is fetched before anything is stored; its entries are
    /// ingested right away.
    ///
    /// # Errors
    ///
    /// - `Fetch` if the URL is unusable or the feed cannot be retrieved
    /// - `Conflict` if the user already subscribes to this URL
    pub async fn subscribe(
        &self,
        user_id: i64,
        request: &SubscribeRequest,
    ) -> Result<(Feed, RefreshOutcome)> {
        let url = request.url.trim();
        validate_url(url, true)?;

        let feeds = FeedRepository::new(self.db.pool());
        if feeds.get_by_user_url(user_id, url).await?.is_some() {
            return Err(FeedflowError::Conflict("feed already subscribed".to_string()));
        }

        let parsed = self.fetcher.fetch(url).await?;

        let title = parsed
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| url.to_string());
        let mut new_feed = NewFeed::new(user_id, url, title);
        if let Some(ref desc) = parsed.description {
            new_feed = new_feed.with_description(desc);
        }
        if let Some(ref site_url) = parsed.site_url {
            new_feed = new_feed.with_site_url(site_url);
        }
        if let Some(ref pattern) = request.title_filter {
            new_feed = new_feed.with_title_filter(pattern);
        }

        let feed = feeds.create(&new_feed).await?;
        let outcome = self.ingest(&feed, parsed).await?;
        feeds.mark_fetched(feed.id).await?;

        info!(
            feed_id = feed.id,
            user_id,
            new_items = outcome.new_items,
            filtered_items = outcome.filtered_items,
            "Subscribed to feed"
        );

        let feed = self.load(feed.id).await?;
        Ok((feed, outcome))
    }

    /// Get a feed owned by the user.
    ///
    /// Returns `NotFound` for a missing feed and `Permission` for a feed
    /// owned by someone else.
    pub async fn get_feed(&self, user_id: i64, feed_id: i64) -> Result<Feed> {
        let feed = self.load(feed_id).await?;
        if feed.user_id != user_id {
            return Err(FeedflowError::Permission(
                "feed belongs to another user".to_string(),
            ));
        }
        Ok(feed)
    }

    /// List the user's feeds with counters.
    pub async fn list_feeds(&self, user_id: i64) -> Result<Vec<FeedWithCounts>> {
        FeedRepository::new(self.db.pool())
            .list_with_counts(user_id)
            .await
    }

    /// Update a feed's tags, default read status, or title filter.
    pub async fn update_feed(
        &self,
        user_id: i64,
        feed_id: i64,
        update: &FeedUpdate,
    ) -> Result<Feed> {
        self.get_feed(user_id, feed_id).await?;
        FeedRepository::new(self.db.pool())
            .update(feed_id, update)
            .await?;
        self.load(feed_id).await
    }

    /// Replace a feed's tags.
    pub async fn set_tags(&self, user_id: i64, feed_id: i64, tags: &[String]) -> Result<Feed> {
        self.get_feed(user_id, feed_id).await?;
        FeedRepository::new(self.db.pool())
            .set_tags(feed_id, tags)
            .await?;
        self.load(feed_id).await
    }

    /// Unsubscribe. The feed's items are deleted with it.
    pub async fn delete_feed(&self, user_id: i64, feed_id: i64) -> Result<()> {
        self.get_feed(user_id, feed_id).await?;
        FeedRepository::new(self.db.pool()).delete(feed_id).await?;
        info!(feed_id, user_id, "Feed deleted");
        Ok(())
    }

    /// Refresh one of the user's feeds.
    pub async fn refresh_feed(&self, user_id: i64, feed_id: i64) -> Result<(Feed, RefreshOutcome)> {
        let feed = self.get_feed(user_id, feed_id).await?;
        let outcome = self.refresh(&feed).await?;
        let feed = self.load(feed_id).await?;
        Ok((feed, outcome))
    }

    /// Refresh every feed of the user, at most `concurrency` at a time.
    ///
    /// A failing feed is logged and recorded on the feed; the others still
    /// refresh.
    pub async fn refresh_all(&self, user_id: i64, concurrency: usize) -> Result<RefreshAllReport> {
        let feeds = FeedRepository::new(self.db.pool())
            .list_by_user(user_id)
            .await?;

        let results: Vec<(i64, Result<RefreshOutcome>)> = stream::iter(feeds)
            .map(|feed| async move {
                let result = self.refresh(&feed).await;
                (feed.id, result)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut report = RefreshAllReport::default();
        for (feed_id, result) in results {
            match result {
                Ok(outcome) => {
                    report.refreshed += 1;
                    report.new_items += outcome.new_items;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(feed_id, user_id, error = %e, "Feed refresh failed");
                }
            }
        }

        info!(
            user_id,
            refreshed = report.refreshed,
            failed = report.failed,
            new_items = report.new_items,
            "Refreshed all feeds"
        );
        Ok(report)
    }

    /// List the user's items, newest first.
    ///
    /// Each feed's title filter is applied to the listing as well, so
    /// items stored before a filter was set are hidden once it is.
    pub async fn list_items(&self, user_id: i64, query: &ItemQuery) -> Result<ItemPage> {
        let per_page = query.per_page();
        let page = query.page();

        let rows = ItemRepository::new(self.db.pool())
            .list_for_user(user_id, query.feed_id, query.tag.as_deref(), query.read)
            .await?;

        let mut filters: HashMap<i64, TitleFilter> = HashMap::new();
        let visible: Vec<ItemWithFeed> = rows
            .into_iter()
            .filter(|row| {
                filters
                    .entry(row.item.feed_id)
                    .or_insert_with(|| TitleFilter::compile(row.feed_title_filter.as_deref()))
                    .keeps(&row.item.title)
            })
            .collect();

        let total = visible.len() as i64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = visible
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();

        Ok(ItemPage {
            items,
            page,
            per_page,
            total,
        })
    }

    /// Get one of the user's items with its feed title.
    pub async fn get_item(&self, user_id: i64, item_id: i64) -> Result<ItemWithFeed> {
        let (item, owner_id) = ItemRepository::new(self.db.pool())
            .get_with_feed(item_id)
            .await?
            .ok_or_else(|| FeedflowError::NotFound("item".to_string()))?;
        if owner_id != user_id {
            return Err(FeedflowError::Permission(
                "item belongs to another user".to_string(),
            ));
        }
        Ok(item)
    }

    /// Set the read flag of an item. Idempotent.
    pub async fn set_item_read(&self, user_id: i64, item_id: i64, read: bool) -> Result<Item> {
        self.get_item(user_id, item_id).await?;
        let items = ItemRepository::new(self.db.pool());
        items.set_read(item_id, read).await?;
        items
            .get_by_id(item_id)
            .await?
            .ok_or_else(|| FeedflowError::NotFound("item".to_string()))
    }

    /// Mark the user's unread items read, optionally scoped to a feed or tag.
    pub async fn mark_all_read(
        &self,
        user_id: i64,
        feed_id: Option<i64>,
        tag: Option<&str>,
    ) -> Result<u64> {
        if let Some(feed_id) = feed_id {
            self.get_feed(user_id, feed_id).await?;
        }
        let count = ItemRepository::new(self.db.pool())
            .mark_all_read(user_id, feed_id, tag)
            .await?;
        debug!(user_id, ?feed_id, ?tag, count, "Marked items read");
        Ok(count)
    }

    async fn load(&self, feed_id: i64) -> Result<Feed> {
        FeedRepository::new(self.db.pool())
            .get_by_id(feed_id)
            .await?
            .ok_or_else(|| FeedflowError::NotFound("feed".to_string()))
    }

    /// Fetch a feed and ingest its new entries.
    async fn refresh(&self, feed: &Feed) -> Result<RefreshOutcome> {
        let feeds = FeedRepository::new(self.db.pool());

        let parsed = match self.fetcher.fetch(&feed.url).await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(feed_id = feed.id, kind = e.kind(), error = %e, "Failed to fetch feed");
                feeds.record_error(feed.id, &e.to_string()).await?;
                return Err(e.into());
            }
        };

        let outcome = self.ingest(feed, parsed).await?;
        feeds.mark_fetched(feed.id).await?;

        if outcome.new_items > 0 {
            info!(
                feed_id = feed.id,
                new_items = outcome.new_items,
                filtered_items = outcome.filtered_items,
                "Feed refreshed"
            );
        } else {
            debug!(feed_id = feed.id, "Feed refreshed: no new items");
        }
        Ok(outcome)
    }

    /// Store the entries of a parsed feed that pass the title filter.
    ///
    /// Only the first `max_items_per_feed` entries of the document are
    /// considered. Untitled entries are skipped. An entry whose link is
    /// already stored for the feed is ignored by the unique (feed, link)
    /// constraint.
    async fn ingest(&self, feed: &Feed, parsed: ParsedFeed) -> Result<RefreshOutcome> {
        let cap = match SystemConfigRepository::new(self.db.pool())
            .max_items_per_feed()
            .await?
        {
            n if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => usize::MAX,
        };
        let filter = TitleFilter::compile(feed.title_filter.as_deref());
        let items = ItemRepository::new(self.db.pool());
        let now = Utc::now();
        let mut outcome = RefreshOutcome::default();

        for entry in parsed.items.into_iter().take(cap) {
            let Some(title) = entry.title.as_deref() else {
                continue;
            };
            if filter.should_drop(title) {
                outcome.filtered_items += 1;
                continue;
            }
            let link = entry.dedup_link();
            if link.is_empty() {
                continue;
            }

            let mut new_item = NewItem::new(feed.id, title, link)
                .with_pub_date(entry.published_at.unwrap_or(now))
                .with_read(feed.default_read_status);
            if let Some(ref desc) = entry.description {
                new_item = new_item.with_description(desc);
            }

            if items.create_or_ignore(&new_item).await?.is_some() {
                outcome.new_items += 1;
            }
        }

        Ok(outcome)
    }
}
