//! Feed ingestion for FeedFlow.
//!
//! This module covers:
//! - Fetching and parsing RSS/Atom feeds
//! - Per-feed title filters
//! - Feed and item storage with (feed, link) deduplication
//! - Refresh of one feed or all of a user's feeds
//! - OPML export
//! - Tracked background tasks

pub mod fetcher;
pub mod filter;
pub mod opml;
mod repository;
mod service;
pub mod tasks;
mod types;

pub use fetcher::{parse_feed, validate_url, FeedFetcher};
pub use filter::TitleFilter;
pub use repository::{FeedRepository, ItemRepository};
pub use service::{FeedService, ItemPage, RefreshAllReport, SubscribeRequest};
pub use tasks::{BackgroundTasks, TaskInfo, TaskState};
pub use types::{
    Feed, FeedUpdate, FeedWithCounts, Item, ItemQuery, ItemWithFeed, NewFeed, NewItem, ParsedFeed,
    ParsedItem, RefreshOutcome, DEFAULT_PAGE_SIZE, MAX_DESCRIPTION_LENGTH, MAX_PAGE_SIZE,
    MAX_TAG_LENGTH,
};
