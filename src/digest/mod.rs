//! Daily digests of unread items.

pub mod prompt;
mod repository;
mod service;

pub use repository::{DailySummary, NewSummary, SummaryRepository};
pub use service::{
    stream_digest, DigestEvent, DigestOutcome, DigestService, MAX_DIGEST_ITEMS, WINDOW_HOURS,
};
