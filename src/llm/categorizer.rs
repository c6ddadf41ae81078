//! Feed tag classifier.

use tracing::info;

use super::client::{ChatRequest, LlmClient, LlmSettings};
use crate::db::Database;
use crate::feed::{Feed, FeedRepository, Item, ItemRepository, MAX_TAG_LENGTH};
use crate::{FeedflowError, Result};

/// Latest items sent along with the feed details.
pub const SAMPLE_ITEMS: i64 = 5;

/// Most tags accepted from one reply.
pub const MAX_TAGS: usize = 5;

/// Sample item descriptions are cut to this many characters.
const SAMPLE_DESCRIPTION_LENGTH: usize = 200;

/// Tags the classifier is encouraged to choose from.
pub const TAG_VOCABULARY: &[&str] = &[
    "技术", "新闻", "财经", "娱乐", "体育", "游戏", "教育", "健康", "生活", "旅游", "美食", "摄影",
    "设计", "开发", "科学", "文化", "艺术", "政治", "AI", "编程", "产品", "商业", "创业", "数据",
    "云计算", "前端", "后端", "其他",
];

const SYSTEM_PROMPT: &str = "你是一个专业的RSS订阅源分类助手。你的任务是分析RSS源的内容，\
并为其分配2-5个最合适的标签。只返回标签名称，多个标签用中文逗号分隔，不要包含任何解释。";

/// Build the classification request for a feed and a sample of its items.
pub fn build_request(feed: &Feed, items: &[Item]) -> ChatRequest {
    let description = feed
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("No description available");

    let samples: Vec<String> = items
        .iter()
        .take(SAMPLE_ITEMS as usize)
        .enumerate()
        .map(|(i, item)| {
            let desc: String = item
                .description
                .as_deref()
                .unwrap_or("")
                .chars()
                .take(SAMPLE_DESCRIPTION_LENGTH)
                .collect();
            format!("{}. {}: {}", i + 1, item.title, desc)
        })
        .collect();
    let samples = if samples.is_empty() {
        "暂无文章内容".to_string()
    } else {
        samples.join("\n")
    };

    let vocabulary: String = TAG_VOCABULARY
        .iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "你是一个RSS订阅源分类助手。请根据以下信息，为这个RSS订阅源分配合适的标签。\n\n\
         RSS源信息：\n- 标题: {title}\n- 描述: {description}\n- 链接: {url}\n\n\
         最近的文章内容（前5篇）：\n{samples}\n\n\
         请从以下常见标签中选择最合适的2-5个（如果都不合适，可以建议新的标签）：\n{vocabulary}\n\n\
         请只返回标签名称，多个标签用中文逗号（，）分隔，不要包含任何其他文字或解释。",
        title = feed.title,
        url = feed.url,
    );

    ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        user,
        temperature: 0.3,
        max_tokens: 50,
    }
}

/// Split a classifier reply into tags.
///
/// Both ASCII and full-width commas separate tags. Blank and duplicate
/// tags are dropped and overlong ones cut to [`MAX_TAG_LENGTH`].
pub fn parse_tags(reply: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in reply.split([',', '，']) {
        let tag: String = raw.trim().chars().take(MAX_TAG_LENGTH).collect();
        if tag.is_empty() || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

/// Classify a feed and store the resulting tags.
///
/// # Errors
///
/// - `NotConfigured` if the completion API settings are missing
/// - `Upstream` if the call fails or the reply holds no tags
pub async fn categorize_feed(db: &Database, client: &LlmClient, feed_id: i64) -> Result<Vec<String>> {
    let settings = LlmSettings::load(db.pool()).await?;

    let feeds = FeedRepository::new(db.pool());
    let feed = feeds
        .get_by_id(feed_id)
        .await?
        .ok_or_else(|| FeedflowError::NotFound("feed".to_string()))?;
    let items = ItemRepository::new(db.pool())
        .list_latest_by_feed(feed_id, SAMPLE_ITEMS)
        .await?;

    let reply = client.complete(&settings, &build_request(&feed, &items)).await?;
    let tags = parse_tags(&reply);
    if tags.is_empty() {
        return Err(FeedflowError::Upstream(
            "classifier returned no tags".to_string(),
        ));
    }

    feeds.set_tags(feed_id, &tags).await?;
    info!(feed_id, tags = ?tags, "Feed categorized");
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn feed() -> Feed {
        Feed {
            id: 1,
            user_id: 1,
            url: "https://blog.example.com/rss".to_string(),
            title: "Example Blog".to_string(),
            description: None,
            site_url: None,
            tags: Vec::new(),
            title_filter: None,
            default_read_status: false,
            last_fetched_at: None,
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_tags_mixed_commas() {
        assert_eq!(parse_tags("技术，编程, AI"), vec!["技术", "编程", "AI"]);
    }

    #[test]
    fn test_parse_tags_drops_blanks_and_duplicates() {
        assert_eq!(parse_tags(" 技术 ,, ，技术, 新闻 "), vec!["技术", "新闻"]);
        assert!(parse_tags("  ").is_empty());
    }

    #[test]
    fn test_parse_tags_limits() {
        let tags = parse_tags("a,b,c,d,e,f,g");
        assert_eq!(tags.len(), MAX_TAGS);

        let long = "x".repeat(80);
        let tags = parse_tags(&long);
        assert_eq!(tags[0].chars().count(), MAX_TAG_LENGTH);
    }

    #[test]
    fn test_build_request() {
        let item = Item {
            id: 1,
            feed_id: 1,
            title: "Rust 1.80 released".to_string(),
            link: "https://blog.example.com/1".to_string(),
            description: Some("d".repeat(500)),
            pub_date: Utc::now(),
            read: false,
            created_at: Utc::now(),
        };

        let request = build_request(&feed(), &[item]);
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, 50);
        assert!(request.user.contains("- 标题: Example Blog"));
        assert!(request.user.contains("No description available"));
        assert!(request.user.contains("1. Rust 1.80 released: "));
        assert!(!request.user.contains(&"d".repeat(201)));
        assert!(request.user.contains("- 云计算"));
    }

    #[test]
    fn test_build_request_without_items() {
        let request = build_request(&feed(), &[]);
        assert!(request.user.contains("暂无文章内容"));
    }
}
