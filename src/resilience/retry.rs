//! Retry eligibility for upstream fetches.

use axum::http::Method;

/// Whether a failed fetch may be reissued.
///
/// A retried non-idempotent request could apply twice upstream, so only
/// GET and HEAD qualify; and only when the failure happened below HTTP
/// (connect or timeout), meaning the origin may not have seen it at all.
pub fn is_retryable(method: &Method, error: &reqwest::Error) -> bool {
    let idempotent = matches!(method.as_str(), "GET" | "HEAD");
    idempotent && (error.is_connect() || error.is_timeout())
}
