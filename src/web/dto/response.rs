//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{config_keys, Role, SummaryLanguage, SystemConfigEntry, User};
use crate::digest::DailySummary;
use crate::feed::{Feed, FeedWithCounts, Item, ItemWithFeed, RefreshOutcome};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, per_page: i64, total: i64) -> Self {
        Self {
            data,
            meta: PaginationMeta {
                page,
                per_page,
                total,
            },
        }
    }
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    /// Total number of matching items.
    pub total: i64,
}

// ============================================================================
// Auth and users
// ============================================================================

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
    pub user: UserInfo,
}

/// User information in responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub summary_language: SummaryLanguage,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            summary_language: user.summary_language,
            created_at: user.created_at,
        }
    }
}

/// User preferences.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsResponse {
    pub summary_language: SummaryLanguage,
}

// ============================================================================
// Feeds and items
// ============================================================================

/// Feed response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub tags: Vec<String>,
    pub title_filter: Option<String>,
    pub default_read_status: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<i64>,
}

impl From<Feed> for FeedResponse {
    fn from(feed: Feed) -> Self {
        Self {
            id: feed.id,
            url: feed.url,
            title: feed.title,
            description: feed.description,
            site_url: feed.site_url,
            tags: feed.tags,
            title_filter: feed.title_filter,
            default_read_status: feed.default_read_status,
            last_fetched_at: feed.last_fetched_at,
            last_error: feed.last_error,
            created_at: feed.created_at,
            updated_at: feed.updated_at,
            item_count: None,
            unread_count: None,
        }
    }
}

impl From<FeedWithCounts> for FeedResponse {
    fn from(f: FeedWithCounts) -> Self {
        Self {
            item_count: Some(f.item_count),
            unread_count: Some(f.unread_count),
            ..FeedResponse::from(f.feed)
        }
    }
}

/// Result of subscribing to or refreshing a feed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub feed: FeedResponse,
    pub new_items_count: usize,
    pub filtered_items_count: usize,
}

impl From<(Feed, RefreshOutcome)> for RefreshResponse {
    fn from((feed, outcome): (Feed, RefreshOutcome)) -> Self {
        Self {
            feed: feed.into(),
            new_items_count: outcome.new_items,
            filtered_items_count: outcome.filtered_items,
        }
    }
}

/// Tags assigned to a feed.
#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// Item response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_tags: Option<Vec<String>>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            feed_id: item.feed_id,
            title: item.title,
            link: item.link,
            description: item.description,
            pub_date: item.pub_date,
            read: item.read,
            created_at: item.created_at,
            feed_title: None,
            feed_tags: None,
        }
    }
}

impl From<ItemWithFeed> for ItemResponse {
    fn from(entry: ItemWithFeed) -> Self {
        Self {
            feed_title: Some(entry.feed_title),
            feed_tags: Some(entry.feed_tags),
            ..ItemResponse::from(entry.item)
        }
    }
}

/// Number of items affected.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Number of items deleted by a cleanup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub deleted_count: u64,
}

/// A background task was scheduled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAcceptedResponse {
    pub task_id: u64,
}

// ============================================================================
// Digests
// ============================================================================

/// A digest, or `null` when there is none.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: Option<DailySummary>,
}

// ============================================================================
// Administration
// ============================================================================

/// System config entry with secrets masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntryResponse {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<SystemConfigEntry> for ConfigEntryResponse {
    fn from(entry: SystemConfigEntry) -> Self {
        let value = if entry.key == config_keys::OPENAI_API_KEY {
            mask_secret(&entry.value)
        } else {
            entry.value
        };
        Self {
            key: entry.key,
            value,
            description: entry.description,
            updated_at: entry.updated_at,
        }
    }
}

/// Mask a secret, keeping only its last four characters visible.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    match chars.len() {
        0 => String::new(),
        n if n <= 8 => "****".to_string(),
        n => {
            let tail: String = chars[n - 4..].iter().collect();
            format!("****{tail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("sk-1234567890abcd"), "****abcd");
    }

    #[test]
    fn test_api_key_masked_in_config_entry() {
        let entry = SystemConfigEntry {
            key: config_keys::OPENAI_API_KEY.to_string(),
            value: "sk-secret-value-9999".to_string(),
            description: None,
            updated_at: Utc::now(),
        };
        assert_eq!(ConfigEntryResponse::from(entry).value, "****9999");

        let entry = SystemConfigEntry {
            key: config_keys::OPENAI_MODEL.to_string(),
            value: "gpt-4o-mini".to_string(),
            description: None,
            updated_at: Utc::now(),
        };
        assert_eq!(ConfigEntryResponse::from(entry).value, "gpt-4o-mini");
    }

    #[test]
    fn test_paginated_response_shape() {
        let resp = PaginatedResponse::new(vec![1, 2], 2, 2, 5);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["meta"]["page"], 2);
        assert_eq!(json["meta"]["per_page"], 2);
        assert_eq!(json["meta"]["total"], 5);
    }
}
