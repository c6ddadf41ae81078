//! Error types for FeedFlow.

use thiserror::Error;

/// Classification of a failed feed fetch.
///
/// Each variant maps to its own user-facing error code so callers can tell
/// a slow server from a typo in the hostname.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The hostname could not be resolved.
    #[error("could not resolve host: {0}")]
    Dns(String),

    /// The remote host refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The response body is not a valid RSS or Atom document.
    #[error("malformed feed: {0}")]
    Malformed(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// The response exceeded the size limit.
    #[error("feed too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    /// The URL is unusable (bad scheme, blocked host, parse failure).
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),

    /// Any other transport failure.
    #[error("fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Dns(_) => "dns",
            FetchError::ConnectionRefused(_) => "connection_refused",
            FetchError::Malformed(_) => "malformed",
            FetchError::Http { .. } => "http",
            FetchError::TooLarge { .. } => "too_large",
            FetchError::InvalidUrl(_) => "invalid_url",
            FetchError::Other(_) => "other",
        }
    }
}

/// Common error type for FeedFlow.
#[derive(Error, Debug)]
pub enum FeedflowError {
    /// Database error.
    ///
    /// Errors from sqlx are converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Feed could not be fetched or parsed.
    #[error("feed fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Chat-completion API failure.
    #[error("upstream API error: {0}")]
    Upstream(String),

    /// Chat-completion API credentials are missing.
    #[error("completion API not configured")]
    NotConfigured,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FeedflowError {
    fn from(e: sqlx::Error) -> Self {
        FeedflowError::Database(e.to_string())
    }
}

/// Result type alias for FeedFlow operations.
pub type Result<T> = std::result::Result<T, FeedflowError>;
