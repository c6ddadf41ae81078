//! Validation utilities for Web API DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::web::error::{ApiError, ErrorCode};

/// A JSON extractor that validates the request body.
///
/// The body is deserialized as JSON and then checked with the `validator`
/// crate. Failures produce a `VALIDATION_ERROR` response with field-level
/// details.
///
/// # Example
///
/// ```ignore
/// use feedflow::web::dto::ValidatedJson;
///
/// async fn create_feed(
///     ValidatedJson(payload): ValidatedJson<CreateFeedRequest>,
/// ) -> Result<Json<ApiResponse<FeedResponse>>, ApiError> {
///     // payload is already validated
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::new(ErrorCode::ValidationError, format!("Invalid JSON: {}", e)))?;

        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use crate::web::dto::CreateFeedRequest;

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let req = json_request(r#"{"url":"https://example.com/rss"}"#);
        let ValidatedJson(body) = ValidatedJson::<CreateFeedRequest>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(body.url, "https://example.com/rss");
        assert!(body.title_filter.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let req = json_request("{not json");
        let err = ValidatedJson::<CreateFeedRequest>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_failed_validation() {
        let req = json_request(r#"{"url":""}"#);
        let err = ValidatedJson::<CreateFeedRequest>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
