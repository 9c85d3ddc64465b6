//! Header policy for both directions of the relay.
//!
//! # Responsibilities
//! - Name the headers never forwarded to the origin (hop-by-hop,
//!   CDN/client identifiers, websocket negotiation)
//! - Name the origin headers never forwarded back to the client
//!   (security policies that would block the rewritten document, and
//!   framing headers invalidated by re-serialization)
//! - Provide browser-typical defaults for outbound headers the client
//!   did not supply

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

/// Inbound headers never forwarded to the origin.
pub const STRIPPED_OUTBOUND: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "accept-encoding",
    "cf-ray",
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "upgrade",
    "sec-websocket-key",
    "sec-websocket-version",
];

/// Origin headers never forwarded back to the client.
///
/// Content-Encoding and Content-Length go because the fetch layer hands
/// us a decoded body and the transform re-serializes it; the rest would
/// block the rewritten, cross-origin-served document from loading.
pub const STRIPPED_INBOUND: &[&str] = &[
    "content-security-policy",
    "content-security-policy-report-only",
    "x-frame-options",
    "x-content-type-options",
    "strict-transport-security",
    "access-control-allow-origin",
    "access-control-allow-methods",
    "access-control-allow-headers",
    "content-encoding",
    "content-length",
    "transfer-encoding",
    "cross-origin-embedder-policy",
    "cross-origin-opener-policy",
    "cross-origin-resource-policy",
    "permissions-policy",
    "referrer-policy",
];

/// Defaults applied outbound only where the client supplied nothing.
/// Values mimic a mainstream desktop browser so origins that gate on
/// them respond normally.
pub const OUTBOUND_DEFAULTS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ),
    ("accept", "*/*"),
    ("accept-language", "en-US,en;q=0.9"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
];

fn contains(names: &[&str], name: &HeaderName) -> bool {
    names.iter().any(|n| name.as_str() == *n)
}

pub fn is_stripped_outbound(name: &HeaderName) -> bool {
    contains(STRIPPED_OUTBOUND, name)
}

pub fn is_stripped_inbound(name: &HeaderName) -> bool {
    contains(STRIPPED_INBOUND, name)
}

/// Build the outbound header map: client headers minus the stripped set,
/// then defaults for whatever is still missing.
pub fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(inbound.len() + OUTBOUND_DEFAULTS.len());
    for (name, value) in inbound {
        if !is_stripped_outbound(name) {
            out.append(name.clone(), value.clone());
        }
    }
    for &(name, value) in OUTBOUND_DEFAULTS {
        let name = HeaderName::from_static(name);
        if !out.contains_key(&name) {
            out.insert(name, HeaderValue::from_static(value));
        }
    }
    out
}
