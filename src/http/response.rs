//! Response assembly.
//!
//! # Responsibilities
//! - Copy upstream headers minus the inbound strip set
//! - Attach permissive CORS headers and `X-Content-Type-Options: nosniff`
//! - Mirror the upstream content type and write the (transformed or
//!   passthrough) body

use axum::body::Body;
use axum::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS,
};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use crate::proxy::headers::is_stripped_inbound;

/// Build the final client response from the upstream status, filtered
/// headers, and body.
pub fn assemble(
    status: StatusCode,
    upstream_headers: &HeaderMap,
    content_type: &str,
    body: Body,
) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in upstream_headers {
        if !is_stripped_inbound(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    attach_cors_headers(headers);
    headers.insert(
        X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("text/html")),
    );

    response
}

/// Local answer for CORS preflight requests; the origin never sees them.
pub fn preflight_response() -> Response {
    let mut response = Response::new(Body::empty());
    let headers = response.headers_mut();
    attach_cors_headers(headers);
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

fn attach_cors_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("*"));
}
