//! Daily digest generation.
//!
//! A digest covers the user's unread items published in the last 24 hours.
//! Once stored for a day it is reused unless regeneration is forced.

use chrono::{Duration, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::prompt::{build_request, messages};
use super::repository::{DailySummary, NewSummary, SummaryRepository};
use crate::datetime::today;
use crate::db::{Database, SummaryLanguage, UserRepository};
use crate::feed::{ItemRepository, ItemWithFeed};
use crate::llm::{LlmClient, LlmSettings};
use crate::{FeedflowError, Result};

/// Length of the unread window.
pub const WINDOW_HOURS: i64 = 24;

/// Most items considered for one digest.
pub const MAX_DIGEST_ITEMS: i64 = 100;

/// Result of a generate request.
#[derive(Debug, Clone)]
pub enum DigestOutcome {
    /// No unread items in the window; nothing was stored.
    NoUnread,
    /// Today's digest already existed and was returned as is.
    Cached(DailySummary),
    /// A digest was generated and stored.
    Generated(DailySummary),
}

impl DigestOutcome {
    pub fn into_summary(self) -> Option<DailySummary> {
        match self {
            DigestOutcome::NoUnread => None,
            DigestOutcome::Cached(s) | DigestOutcome::Generated(s) => Some(s),
        }
    }
}

/// Event relayed to a client following a streamed generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DigestEvent {
    Start,
    Token {
        data: String,
    },
    Error {
        data: String,
    },
    Done {
        #[serde(rename = "itemCount")]
        item_count: i64,
    },
}

/// Service for daily digests.
pub struct DigestService<'a> {
    db: &'a Database,
    client: &'a LlmClient,
}

impl<'a> DigestService<'a> {
    pub fn new(db: &'a Database, client: &'a LlmClient) -> Self {
        Self { db, client }
    }

    /// Today's digest, if one was stored.
    pub async fn today(&self, user_id: i64) -> Result<Option<DailySummary>> {
        SummaryRepository::new(self.db.pool())
            .get(user_id, today())
            .await
    }

    /// The user's preferred digest language.
    pub async fn language(&self, user_id: i64) -> Result<SummaryLanguage> {
        UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .map(|u| u.summary_language)
            .ok_or_else(|| FeedflowError::NotFound("user".to_string()))
    }

    /// Unread items of the window, newest first.
    pub async fn unread_items(&self, user_id: i64) -> Result<Vec<ItemWithFeed>> {
        let since = Utc::now() - Duration::hours(WINDOW_HOURS);
        ItemRepository::new(self.db.pool())
            .list_unread_since(user_id, since, MAX_DIGEST_ITEMS)
            .await
    }

    /// Generate today's digest in one completion call.
    ///
    /// Without `force`, an existing digest is returned unchanged.
    pub async fn generate(&self, user_id: i64, force: bool) -> Result<DigestOutcome> {
        if !force {
            if let Some(existing) = self.today(user_id).await? {
                return Ok(DigestOutcome::Cached(existing));
            }
        }

        let items = self.unread_items(user_id).await?;
        if items.is_empty() {
            debug!(user_id, "No unread items for digest");
            return Ok(DigestOutcome::NoUnread);
        }

        let language = self.language(user_id).await?;
        let settings = LlmSettings::load(self.db.pool()).await?;
        info!(user_id, items = items.len(), %language, "Generating daily digest");

        let content = self
            .client
            .complete(&settings, &build_request(&items, language))
            .await?;

        let summary = self
            .store(user_id, content, language, items.len() as i64, force)
            .await?;
        Ok(DigestOutcome::Generated(summary))
    }

    /// Generate today's digest if none exists, never failing.
    ///
    /// Errors are logged and reported as no digest.
    pub async fn check_and_generate(&self, user_id: i64) -> Option<DailySummary> {
        match self.generate(user_id, false).await {
            Ok(outcome) => outcome.into_summary(),
            Err(e) => {
                warn!(user_id, error = %e, "Automatic digest generation failed");
                None
            }
        }
    }

    /// Store a digest assembled by the client.
    ///
    /// Without `force`, an existing digest for today is a conflict.
    pub async fn save(
        &self,
        user_id: i64,
        content: &str,
        item_count: i64,
        force: bool,
    ) -> Result<DailySummary> {
        if content.trim().is_empty() {
            return Err(FeedflowError::Validation("content is required".to_string()));
        }
        let language = self.language(user_id).await?;
        let summary = NewSummary {
            user_id,
            date: today(),
            content: content.to_string(),
            language,
            item_count: item_count.max(0),
        };

        let repo = SummaryRepository::new(self.db.pool());
        if force {
            return repo.upsert(&summary).await;
        }
        repo.insert(&summary)
            .await?
            .ok_or_else(|| FeedflowError::Conflict("summary already exists for today".to_string()))
    }

    /// Insert, or overwrite when forced. A digest stored concurrently by
    /// another request wins over an unforced one.
    async fn store(
        &self,
        user_id: i64,
        content: String,
        language: SummaryLanguage,
        item_count: i64,
        force: bool,
    ) -> Result<DailySummary> {
        let summary = NewSummary {
            user_id,
            date: today(),
            content,
            language,
            item_count,
        };
        let repo = SummaryRepository::new(self.db.pool());
        if force {
            return repo.upsert(&summary).await;
        }
        match repo.insert(&summary).await? {
            Some(stored) => Ok(stored),
            None => repo
                .get(user_id, summary.date)
                .await?
                .ok_or_else(|| FeedflowError::NotFound("summary".to_string())),
        }
    }

    async fn stream_into(
        &self,
        user_id: i64,
        language: SummaryLanguage,
        force: bool,
        tx: &mpsc::Sender<DigestEvent>,
    ) -> Result<()> {
        if !force {
            if let Some(existing) = self.today(user_id).await? {
                let _ = tx
                    .send(DigestEvent::Token {
                        data: existing.content,
                    })
                    .await;
                let _ = tx
                    .send(DigestEvent::Done {
                        item_count: existing.item_count,
                    })
                    .await;
                return Ok(());
            }
        }

        let items = self.unread_items(user_id).await?;
        if items.is_empty() {
            let _ = tx
                .send(DigestEvent::Error {
                    data: messages::no_unread(language).to_string(),
                })
                .await;
            return Ok(());
        }

        let settings = LlmSettings::load(self.db.pool()).await?;
        info!(user_id, items = items.len(), %language, "Streaming daily digest");
        let mut tokens = self
            .client
            .stream(&settings, &build_request(&items, language))
            .await?;

        let mut content = String::new();
        while let Some(token) = tokens.next().await {
            let token = token?;
            content.push_str(&token);
            if tx.send(DigestEvent::Token { data: token }).await.is_err() {
                info!(user_id, "Client disconnected, digest abandoned");
                return Ok(());
            }
        }

        if content.trim().is_empty() {
            let _ = tx
                .send(DigestEvent::Error {
                    data: messages::empty(language).to_string(),
                })
                .await;
            return Ok(());
        }

        let item_count = items.len() as i64;
        self.store(user_id, content, language, item_count, force)
            .await?;
        let _ = tx.send(DigestEvent::Done { item_count }).await;
        Ok(())
    }
}

/// Stream a digest generation as events.
///
/// The sequence always opens with `Start` and ends with either `Done` or
/// `Error`. The digest is stored only once the completion finished; an
/// interrupted completion or a departed client stores nothing.
pub fn stream_digest(
    db: Database,
    client: LlmClient,
    user_id: i64,
    force: bool,
) -> impl Stream<Item = DigestEvent> + Send + 'static {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        if tx.send(DigestEvent::Start).await.is_err() {
            return;
        }
        let service = DigestService::new(&db, &client);
        let language = service.language(user_id).await.unwrap_or_default();

        if let Err(e) = service.stream_into(user_id, language, force, &tx).await {
            warn!(user_id, error = %e, "Digest stream failed");
            let message = match e {
                FeedflowError::NotConfigured => messages::not_configured(language),
                _ => messages::failed(language),
            };
            let _ = tx
                .send(DigestEvent::Error {
                    data: message.to_string(),
                })
                .await;
        }
    });

    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
}
