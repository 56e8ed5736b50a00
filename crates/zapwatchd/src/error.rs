//! API error type and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use zapwatch_common::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    #[error("Duplicate log entry")]
    Duplicate,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Internal(String),
}

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Duplicate => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::Duplicate,
            StoreError::InvalidStatus(_) | StoreError::InvalidTimestamp(_) => {
                ApiError::Validation(err.to_string())
            }
            other => {
                error!("Store failure: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_duplicate_is_conflict() {
        let (status, json) = body_json(ApiError::Duplicate).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["detail"], "Duplicate log entry");
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let (status, json) = body_json(ApiError::NotFound("Log not found".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["detail"], "Log not found");
    }

    #[tokio::test]
    async fn test_payload_too_large_response() {
        let (status, json) =
            body_json(ApiError::PayloadTooLarge("Request body too large".to_string())).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["detail"], "Request body too large");
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ApiError::from(StoreError::Duplicate),
            ApiError::Duplicate
        ));

        let invalid = ApiError::from(StoreError::InvalidStatus("bogus".to_string()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert!(invalid.to_string().contains("bogus"));

        let far = ApiError::from(StoreError::InvalidTimestamp("+33658-09-27".to_string()));
        assert_eq!(far.status_code(), StatusCode::BAD_REQUEST);

        let task = ApiError::from(StoreError::Task("cancelled".to_string()));
        assert_eq!(task.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(task.to_string().contains("cancelled"));
    }
}
