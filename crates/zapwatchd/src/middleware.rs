//! Request middleware for body limits

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Rejects requests whose Content-Length exceeds `max_bytes`.
///
/// Bodies without a Content-Length are bounded by axum's `DefaultBodyLimit`.
pub async fn body_size_limit(
    State(max_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared {
        if length > max_bytes {
            warn!(
                "Request body too large: {} bytes (max: {})",
                length, max_bytes
            );
            return Err(ApiError::PayloadTooLarge(
                "Request body too large".to_string(),
            ));
        }
    }

    Ok(next.run(request).await)
}
