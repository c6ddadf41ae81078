//! OPML export of a user's subscriptions.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use opml::{Body, Head, Outline, OPML};

use super::types::Feed;
use crate::{FeedflowError, Result};

/// Title written to the OPML head.
pub const OPML_TITLE: &str = "FeedFlow Subscriptions";

fn feed_outline(feed: &Feed) -> Outline {
    Outline {
        text: feed.title.clone(),
        title: Some(feed.title.clone()),
        r#type: Some("rss".to_string()),
        xml_url: Some(feed.url.clone()),
        html_url: Some(feed.site_url.clone().unwrap_or_else(|| feed.url.clone())),
        ..Default::default()
    }
}

/// Build the OPML document for a list of feeds.
///
/// Tagged feeds are grouped under one outline per tag, in tag order; a feed
/// with several tags appears in each group. Untagged feeds follow at the top
/// level.
pub fn build_opml(feeds: &[Feed]) -> Result<String> {
    let mut groups: BTreeMap<&str, Vec<&Feed>> = BTreeMap::new();
    let mut untagged = Vec::new();

    for feed in feeds {
        if feed.tags.is_empty() {
            untagged.push(feed);
        } else {
            for tag in &feed.tags {
                groups.entry(tag.as_str()).or_default().push(feed);
            }
        }
    }

    let mut outlines: Vec<Outline> = groups
        .into_iter()
        .map(|(tag, feeds)| Outline {
            text: tag.to_string(),
            title: Some(tag.to_string()),
            outlines: feeds.into_iter().map(feed_outline).collect(),
            ..Default::default()
        })
        .collect();
    outlines.extend(untagged.into_iter().map(feed_outline));

    let now = Utc::now().to_rfc2822();
    let document = OPML {
        head: Some(Head {
            title: Some(OPML_TITLE.to_string()),
            date_created: Some(now.clone()),
            date_modified: Some(now),
            ..Default::default()
        }),
        body: Body { outlines },
        ..Default::default()
    };

    document
        .to_string()
        .map_err(|e| {
            FeedflowError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to serialize OPML: {e}"),
            ))
        })
}

/// Download filename for an export made on `date`.
pub fn export_filename(date: NaiveDate) -> String {
    format!("feeds-{}.opml", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(id: i64, title: &str, url: &str, tags: &[&str]) -> Feed {
        Feed {
            id,
            user_id: 1,
            url: url.to_string(),
            title: title.to_string(),
            description: None,
            site_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            title_filter: None,
            default_read_status: false,
            last_fetched_at: None,
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_opml_groups_by_tag() {
        let feeds = vec![
            feed(1, "Rust Blog", "https://blog.rust-lang.org/feed.xml", &["tech", "rust"]),
            feed(2, "World News", "https://news.example.com/rss", &["news"]),
            feed(3, "Misc", "https://misc.example.com/rss", &[]),
        ];

        let xml = build_opml(&feeds).unwrap();
        let parsed: OPML = OPML::from_str(&xml).unwrap();

        assert_eq!(
            parsed.head.and_then(|h| h.title).as_deref(),
            Some(OPML_TITLE)
        );
        let top: Vec<&str> = parsed.body.outlines.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(top, vec!["news", "rust", "tech", "Misc"]);

        let rust = &parsed.body.outlines[1];
        assert_eq!(rust.outlines.len(), 1);
        assert_eq!(
            rust.outlines[0].xml_url.as_deref(),
            Some("https://blog.rust-lang.org/feed.xml")
        );
        assert_eq!(rust.outlines[0].r#type.as_deref(), Some("rss"));
        assert_eq!(parsed.body.outlines[2].outlines[0].text, "Rust Blog");

        let misc = &parsed.body.outlines[3];
        assert!(misc.outlines.is_empty());
        assert_eq!(misc.html_url.as_deref(), Some("https://misc.example.com/rss"));
    }

    #[test]
    fn test_build_opml_escapes_text() {
        let feeds = vec![feed(1, "Tom & Jerry <news>", "https://example.com/?a=1&b=2", &[])];
        let xml = build_opml(&feeds).unwrap();
        assert!(!xml.contains("Tom & Jerry"));

        let parsed: OPML = OPML::from_str(&xml).unwrap();
        assert_eq!(parsed.body.outlines[0].text, "Tom & Jerry <news>");
        assert_eq!(
            parsed.body.outlines[0].xml_url.as_deref(),
            Some("https://example.com/?a=1&b=2")
        );
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_filename(date), "feeds-2024-03-09.opml");
    }
}
