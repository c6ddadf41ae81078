//! Digest prompt construction.
//!
//! Unread items are grouped by every tag of their feed; items of untagged
//! feeds form a trailing "other" group. Groups are rendered in tag order
//! with at most [`ITEMS_PER_GROUP`] items each.

use std::collections::BTreeMap;

use crate::db::SummaryLanguage;
use crate::feed::ItemWithFeed;
use crate::llm::ChatRequest;

/// Items rendered per group.
pub const ITEMS_PER_GROUP: usize = 5;

/// Descriptions longer than this many characters are cut.
pub const DESCRIPTION_PREVIEW_LENGTH: usize = 200;

/// Label of the group holding items from untagged feeds.
pub fn other_label(language: SummaryLanguage) -> &'static str {
    match language {
        SummaryLanguage::Zh => "其他",
        SummaryLanguage::En => "Other",
    }
}

/// Cut a description to the preview length, marking the cut with `...`.
pub fn preview(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_PREVIEW_LENGTH {
        let mut cut: String = description.chars().take(DESCRIPTION_PREVIEW_LENGTH).collect();
        cut.push_str("...");
        cut
    } else {
        description.to_string()
    }
}

/// Items grouped for the prompt, each group in input order.
#[derive(Debug, Default)]
pub struct GroupedItems<'a> {
    pub tagged: BTreeMap<&'a str, Vec<&'a ItemWithFeed>>,
    pub untagged: Vec<&'a ItemWithFeed>,
}

/// Group items by feed tag. An item with two tags lands in both groups.
pub fn group_items(items: &[ItemWithFeed]) -> GroupedItems<'_> {
    let mut groups = GroupedItems::default();
    for item in items {
        if item.feed_tags.is_empty() {
            groups.untagged.push(item);
        } else {
            for tag in &item.feed_tags {
                groups.tagged.entry(tag.as_str()).or_default().push(item);
            }
        }
    }
    groups
}

/// Render the grouped item list embedded in the user prompt.
pub fn render_groups(items: &[ItemWithFeed], language: SummaryLanguage) -> String {
    let groups = group_items(items);
    let mut out = String::new();

    for (tag, items) in &groups.tagged {
        out.push_str(&format!("\n## {tag}\n"));
        for (i, entry) in items.iter().take(ITEMS_PER_GROUP).enumerate() {
            out.push_str(&format!("{}. {}", i + 1, entry.item.title));
            if let Some(desc) = entry.item.description.as_deref().filter(|d| !d.trim().is_empty()) {
                out.push_str(&format!("\n   {}", preview(desc)));
            }
            out.push('\n');
        }
    }

    if !groups.untagged.is_empty() {
        out.push_str(&format!("\n## {}\n", other_label(language)));
        for (i, entry) in groups.untagged.iter().take(ITEMS_PER_GROUP).enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, entry.item.title));
        }
    }

    out
}

const SYSTEM_ZH: &str = "你是一个专业的新闻摘要助手。你的任务是分析过去24小时内的未读文章，\
生成简洁、有条理的每日摘要。摘要应该突出重点，帮助用户快速了解重要信息。使用markdown格式输出。";

const SYSTEM_EN: &str = "You are a professional news summarization assistant. Your task is to \
analyze unread articles from the last 24 hours and generate a concise, well-organized daily \
summary. The summary should highlight key points and help users quickly understand important \
information. Use markdown format.";

fn user_prompt(groups: &str, language: SummaryLanguage) -> String {
    match language {
        SummaryLanguage::Zh => format!(
            "请基于以下过去24小时的未读文章生成今日摘要：\n\n{groups}\n\n\
             请按以下格式生成摘要：\n\n\
             ## 今日要点\n列出3-5个最重要的新闻或趋势\n\n\
             ## 分类摘要\n按分类简要总结各领域的主要动态\n\n\
             ## 值得关注\n推荐3-5篇特别值得阅读的文章及其理由\n\n\
             保持简洁，每部分控制在2-3句话。使用markdown格式。"
        ),
        SummaryLanguage::En => format!(
            "Please generate a daily summary based on the following unread articles from the \
             last 24 hours:\n\n{groups}\n\n\
             Please format the summary as follows:\n\n\
             ## Today's Highlights\nList 3-5 most important news or trends\n\n\
             ## Category Summaries\nBriefly summarize key developments in each category\n\n\
             ## Worth Reading\nRecommend 3-5 articles that are particularly worth reading with reasons\n\n\
             Keep it concise, limit each section to 2-3 sentences. Use markdown format."
        ),
    }
}

/// Build the digest completion request.
pub fn build_request(items: &[ItemWithFeed], language: SummaryLanguage) -> ChatRequest {
    let system = match language {
        SummaryLanguage::Zh => SYSTEM_ZH,
        SummaryLanguage::En => SYSTEM_EN,
    };
    ChatRequest {
        system: system.to_string(),
        user: user_prompt(&render_groups(items, language), language),
        temperature: 0.5,
        max_tokens: 1000,
    }
}

/// User-facing digest messages.
pub mod messages {
    use crate::db::SummaryLanguage;

    pub fn not_configured(language: SummaryLanguage) -> &'static str {
        match language {
            SummaryLanguage::Zh => "未配置 OpenAI API，请在管理员设置中配置",
            SummaryLanguage::En => "OpenAI API not configured, please configure in admin settings",
        }
    }

    pub fn no_unread(language: SummaryLanguage) -> &'static str {
        match language {
            SummaryLanguage::Zh => "过去24小时内没有未读文章",
            SummaryLanguage::En => "No unread articles in the last 24 hours",
        }
    }

    pub fn failed(language: SummaryLanguage) -> &'static str {
        match language {
            SummaryLanguage::Zh => "生成摘要时发生错误",
            SummaryLanguage::En => "Error occurred while generating summary",
        }
    }

    pub fn empty(language: SummaryLanguage) -> &'static str {
        match language {
            SummaryLanguage::Zh => "未收到有效的摘要内容",
            SummaryLanguage::En => "No valid summary content received",
        }
    }
}
