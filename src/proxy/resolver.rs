//! Target URL resolution.
//!
//! # Responsibilities
//! - Explicit mode: recover an absolute target from a percent-encoded
//!   path segment or `url`/`u` query parameter
//! - Implicit mode: reconstruct the target for an unprefixed relative
//!   path from the `Referer` of a previously proxied page
//!
//! # Design Decisions
//! - Decoding failures fall back to the raw value instead of failing
//!   the request
//! - Scheme-less explicit targets get `https://`; protocol-relative
//!   ones get `https:`
//! - When no referer maps to a known prefix, resolution reports
//!   unresolvable rather than guessing an origin; an operator can opt
//!   into a fixed fallback host via configuration

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ProxyError;

/// Percent-decode, falling back to the raw value when the bytes are not
/// valid UTF-8 after decoding.
pub fn decode_loose(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Whether a decoded reference already names its origin.
pub fn looks_absolute(decoded: &str) -> bool {
    decoded.starts_with("http://") || decoded.starts_with("https://") || decoded.starts_with("//")
}

/// Explicit-mode resolution: decode, repair the scheme, validate.
pub fn resolve_explicit(raw: &str) -> Result<Url, ProxyError> {
    let decoded = decode_loose(raw);
    let candidate = if decoded.starts_with("//") {
        format!("https:{}", decoded)
    } else if !decoded.starts_with("http://") && !decoded.starts_with("https://") {
        format!("https://{}", decoded)
    } else {
        decoded
    };

    Url::parse(&candidate).map_err(|e| ProxyError::InvalidTarget(format!("{}: {}", candidate, e)))
}

/// Recover the previous proxied target from a referer whose path starts
/// with one of the known prefixes. Returns the matched prefix and the
/// decoded target.
pub fn base_from_referer(referer: &str, prefixes: &[String]) -> Option<(String, Url)> {
    let referer_url = Url::parse(referer).ok()?;
    let path = referer_url.path();
    for prefix in prefixes {
        if let Some(encoded) = path.strip_prefix(&format!("{}/", prefix)) {
            if encoded.is_empty() {
                continue;
            }
            if let Ok(base) = Url::parse(&decode_loose(encoded)) {
                return Some((prefix.clone(), base));
            }
        }
    }
    None
}

/// Standard relative resolution of the current request against a
/// recovered base: a root-relative path replaces the full path, a bare
/// relative path joins the base's directory.
pub fn resolve_relative(base: &Url, relative: &str) -> Option<Url> {
    base.join(relative).ok()
}

/// Opt-in last resort for referer-less relative paths: pin the path to a
/// configured host.
pub fn fallback_candidate(host: &str, path_and_query: &str) -> Result<Url, ProxyError> {
    let sep = if path_and_query.starts_with('/') { "" } else { "/" };
    let candidate = format!("https://{}{}{}", host, sep, path_and_query);
    Url::parse(&candidate).map_err(|e| ProxyError::InvalidTarget(format!("{}: {}", candidate, e)))
}
