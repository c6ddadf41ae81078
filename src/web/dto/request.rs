//! Request DTOs for Web API.

use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

use crate::db::{Role, SummaryLanguage};
use crate::feed::MAX_TAG_LENGTH;

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Absent yields `None` (via `#[serde(default)]`), `null` yields
/// `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Each tag must be 1..=50 characters.
fn valid_tags(tags: &[String]) -> Result<(), ValidationError> {
    let ok = tags.iter().all(|t| {
        let len = t.trim().chars().count();
        (1..=MAX_TAG_LENGTH).contains(&len)
    });
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("tags")
            .with_message("Each tag must be between 1 and 50 characters".into()))
    }
}

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: Option<String>,
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Subscribe to a feed.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedRequest {
    #[validate(length(min = 1, max = 2048, message = "URL is required"))]
    pub url: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub title_filter: Option<String>,
}

/// Partial feed update.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedRequest {
    #[serde(default)]
    #[validate(custom(function = "valid_tags"))]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub default_read_status: Option<bool>,
    /// `null` or `""` clears the filter.
    #[serde(default, deserialize_with = "nullable")]
    pub title_filter: Option<Option<String>>,
}

/// Item listing query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsQuery {
    pub feed_id: Option<i64>,
    pub tag: Option<String>,
    pub read: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Set an item's read flag.
#[derive(Debug, Deserialize, Validate)]
pub struct SetReadRequest {
    pub read: bool,
}

/// Mark items read, optionally scoped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadRequest {
    #[serde(default)]
    pub feed_id: Option<i64>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Digest generation options.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateSummaryRequest {
    #[serde(default)]
    pub force: bool,
}

/// Store a client-assembled digest.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummaryRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub item_count: i64,
    #[serde(default)]
    pub force: bool,
}

/// Retention settings update. Days are checked by the retention module.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCleanupSettingsRequest {
    #[serde(default)]
    pub item_retention_days: Option<i64>,
    #[serde(default)]
    pub item_retention_only_read: Option<bool>,
}

/// User preference update.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserSettingsRequest {
    pub summary_language: SummaryLanguage,
}

/// System config value update.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConfigRequest {
    pub value: String,
}

/// Role change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub role: Role,
}
