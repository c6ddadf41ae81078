//! Per-feed title filter.
//!
//! A feed may carry a regular expression; items whose title matches it
//! (case-insensitively) are dropped. A pattern that does not compile
//! disables filtering instead of failing the refresh.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Compiled title filter for one refresh or listing pass.
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    regex: Option<Regex>,
}

impl TitleFilter {
    /// Compile an optional pattern.
    ///
    /// Absent, blank, and invalid patterns all yield a filter that keeps
    /// every title; invalid ones are logged.
    pub fn compile(pattern: Option<&str>) -> Self {
        let Some(pattern) = pattern.filter(|p| !p.trim().is_empty()) else {
            return Self::default();
        };

        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Self { regex: Some(regex) },
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid title filter, filtering disabled");
                Self::default()
            }
        }
    }

    /// Whether the filter is active.
    pub fn is_active(&self) -> bool {
        self.regex.is_some()
    }

    /// Returns `true` if an item with this title should be dropped.
    pub fn should_drop(&self, title: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(title))
    }

    /// Returns `true` if an item with this title should be kept.
    pub fn keeps(&self, title: &str) -> bool {
        !self.should_drop(title)
    }
}
