//! Error taxonomy for the proxy pipeline.
//!
//! # Responsibilities
//! - Classify failures by pipeline stage (resolution, fetch, assembly)
//! - Map each class to an HTTP status and JSON body
//!
//! # Design Decisions
//! - Errors are terminal for the current request; nothing here retries
//! - Detail for internal failures is exposed only in debug builds

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Hint attached to 404 responses for paths that look like relative
/// references escaping a proxied page.
pub const RELATIVE_PATH_HINT: &str = "This might be a relative path from a proxied site. \
     Make sure you accessed it through the proxy by clicking a link from a proxied page.";

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The requested target could not be parsed as a URL.
    #[error("invalid target URL: {0}")]
    InvalidTarget(String),

    /// No explicit target and the referer chain gave us nothing to
    /// resolve against. Carries the client-facing message.
    #[error("{0}")]
    Unresolvable(String),

    /// The outbound fetch failed at the transport level.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Inbound body exceeded the configured limit.
    #[error("request body too large: {0}")]
    PayloadTooLarge(String),

    /// Anything else that broke mid-pipeline.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::InvalidTarget(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid URL", "message": message })),
            )
                .into_response(),
            ProxyError::Unresolvable(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Not Found",
                    "message": message,
                    "hint": RELATIVE_PATH_HINT,
                })),
            )
                .into_response(),
            ProxyError::Upstream(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Proxy error", "message": message })),
            )
                .into_response(),
            ProxyError::PayloadTooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "Payload Too Large", "message": message })),
            )
                .into_response(),
            ProxyError::Internal(message) => {
                // Mirror of the usual dev/prod split: detail only in debug builds.
                let exposed = if cfg!(debug_assertions) {
                    message
                } else {
                    "An unexpected error occurred".to_string()
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error", "message": exposed })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                ProxyError::InvalidTarget("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProxyError::Unresolvable("GET:/a".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ProxyError::Upstream("connect refused".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ProxyError::PayloadTooLarge("11MiB".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
