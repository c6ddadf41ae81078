//! Chat-completion integration.
//!
//! A thin OpenAI-compatible client plus the feed tag classifier built on it.

pub mod categorizer;
mod client;

pub use categorizer::{categorize_feed, parse_tags};
pub use client::{ChatRequest, LlmClient, LlmSettings, TokenStream};
