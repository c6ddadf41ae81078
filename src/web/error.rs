//! API error handling for the FeedFlow HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::FetchError;
use crate::FeedflowError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Conflict (409).
    Conflict,
    /// Validation error (400) - malformed input or field-level errors.
    ValidationError,
    /// Feed fetch timed out (408).
    FetchTimeout,
    /// Feed host could not be resolved (400).
    FetchDns,
    /// Feed host refused the connection (400).
    FetchConnectionRefused,
    /// Feed content is not RSS/Atom (400).
    FetchMalformed,
    /// Feed server answered with an error status (400).
    FetchHttp,
    /// Feed response too large (400).
    FetchTooLarge,
    /// Feed URL rejected (400).
    FetchInvalidUrl,
    /// Other feed fetch failure (400).
    FetchFailed,
    /// Completion API credentials missing (502).
    NotConfigured,
    /// Completion API failure (502).
    UpstreamError,
    /// Too many requests (429).
    TooManyRequests,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::FetchTimeout => StatusCode::REQUEST_TIMEOUT,
            ErrorCode::FetchDns
            | ErrorCode::FetchConnectionRefused
            | ErrorCode::FetchMalformed
            | ErrorCode::FetchHttp
            | ErrorCode::FetchTooLarge
            | ErrorCode::FetchInvalidUrl
            | ErrorCode::FetchFailed => StatusCode::BAD_REQUEST,
            ErrorCode::NotConfigured | ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation errors, only present for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Create a validation error with field-level details.
    pub fn validation(details: HashMap<String, Vec<String>>) -> Self {
        Self::with_details(ErrorCode::ValidationError, "Validation failed", details)
    }

    /// Create a validation error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details: HashMap<String, Vec<String>> = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            details.insert(field.to_string(), messages);
        }

        Self::validation(details)
    }

    fn fetch(err: &FetchError) -> Self {
        let code = match err {
            FetchError::Timeout => ErrorCode::FetchTimeout,
            FetchError::Dns(_) => ErrorCode::FetchDns,
            FetchError::ConnectionRefused(_) => ErrorCode::FetchConnectionRefused,
            FetchError::Malformed(_) => ErrorCode::FetchMalformed,
            FetchError::Http { .. } => ErrorCode::FetchHttp,
            FetchError::TooLarge { .. } => ErrorCode::FetchTooLarge,
            FetchError::InvalidUrl(_) => ErrorCode::FetchInvalidUrl,
            FetchError::Other(_) => ErrorCode::FetchFailed,
        };
        let message = match err {
            FetchError::Timeout => "Timed out while fetching the feed".to_string(),
            FetchError::Dns(_) => "Could not resolve the feed host".to_string(),
            FetchError::ConnectionRefused(_) => "The feed server refused the connection".to_string(),
            FetchError::Malformed(_) => "The URL does not point to a valid RSS or Atom feed".to_string(),
            _ => err.to_string(),
        };
        Self::new(code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<FeedflowError> for ApiError {
    fn from(err: FeedflowError) -> Self {
        match &err {
            FeedflowError::Auth(msg) => ApiError::unauthorized(msg.clone()),
            FeedflowError::Permission(msg) => ApiError::forbidden(msg.clone()),
            FeedflowError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            FeedflowError::Validation(msg) => ApiError::new(ErrorCode::ValidationError, msg.clone()),
            FeedflowError::Conflict(msg) => ApiError::conflict(msg.clone()),
            FeedflowError::Fetch(e) => ApiError::fetch(e),
            FeedflowError::NotConfigured => ApiError::new(
                ErrorCode::NotConfigured,
                "OpenAI API is not configured, ask an administrator to set it up",
            ),
            FeedflowError::Upstream(msg) => {
                tracing::warn!("Completion API error: {}", msg);
                ApiError::new(ErrorCode::UpstreamError, "The completion API request failed")
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ValidationError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::FetchTimeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(ErrorCode::FetchDns.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::UpstreamError.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_feedflow_error() {
        let cases = [
            (FeedflowError::Auth("x".into()), ErrorCode::Unauthorized),
            (FeedflowError::Permission("x".into()), ErrorCode::Forbidden),
            (FeedflowError::NotFound("feed".into()), ErrorCode::NotFound),
            (FeedflowError::Validation("x".into()), ErrorCode::ValidationError),
            (FeedflowError::Conflict("x".into()), ErrorCode::Conflict),
            (FeedflowError::NotConfigured, ErrorCode::NotConfigured),
            (FeedflowError::Upstream("x".into()), ErrorCode::UpstreamError),
            (FeedflowError::Database("x".into()), ErrorCode::InternalError),
            (FeedflowError::Config("x".into()), ErrorCode::InternalError),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code(), code);
        }
    }

    #[test]
    fn test_fetch_error_codes() {
        let cases = [
            (FetchError::Timeout, ErrorCode::FetchTimeout),
            (FetchError::Dns("h".into()), ErrorCode::FetchDns),
            (FetchError::ConnectionRefused("h".into()), ErrorCode::FetchConnectionRefused),
            (FetchError::Malformed("x".into()), ErrorCode::FetchMalformed),
            (FetchError::Http { status: 404 }, ErrorCode::FetchHttp),
            (FetchError::TooLarge { size: 2, max: 1 }, ErrorCode::FetchTooLarge),
            (FetchError::InvalidUrl("x".into()), ErrorCode::FetchInvalidUrl),
            (FetchError::Other("x".into()), ErrorCode::FetchFailed),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(FeedflowError::Fetch(err)).code(), code);
        }
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = ApiError::from(FeedflowError::Database("disk I/O error".into()));
        assert_eq!(err.message, "An internal error occurred");
    }

    #[test]
    fn test_validation_error() {
        let mut details = HashMap::new();
        details.insert("email".to_string(), vec!["Invalid format".to_string()]);

        let err = ApiError::validation(details);
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Validation failed");
        assert_eq!(
            err.details.unwrap().get("email").unwrap(),
            &vec!["Invalid format".to_string()]
        );
    }
}
