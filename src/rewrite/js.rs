//! Best-effort rewriting of literal URL call sites in script text.
//!
//! This is deliberately textual matching, not a JavaScript parse: only
//! string literals that appear verbatim at a known call site are caught.
//! URLs constructed at runtime are out of reach here and are handled by
//! the injected runtime shim instead.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::rewrite::RewriteContext;

static FETCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bfetch\s*\(\s*(["'])((?:https?://|/)[^"']+)["']"#)
        .expect("valid fetch regex")
});

static XHR_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\.open\s*\(\s*(["'])(GET|POST|PUT|DELETE|PATCH)["']\s*,\s*(["'])((?:https?://|/)[^"']+)["']"#,
    )
    .expect("valid XMLHttpRequest open regex")
});

static HTTP_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(axios|\.get|\.post|\.put|\.delete|\.patch)\s*\(\s*(["'])(https?://[^"']+)["']"#)
        .expect("valid HTTP verb call regex")
});

static WEBSOCKET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bnew\s+WebSocket\s*\(\s*(["'])(wss?://[^"']+)["']"#)
        .expect("valid WebSocket regex")
});

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(window\.location\.href|window\.location|document\.location|location\.href)\s*=\s*(["'])(https?://[^"']+)["']"#,
    )
    .expect("valid location assignment regex")
});

/// Apply every literal-call pattern in a fixed order.
pub fn rewrite_script_calls(input: &str, ctx: &RewriteContext) -> String {
    let out = FETCH_RE
        .replace_all(input, |caps: &Captures| {
            let quote = &caps[1];
            match ctx.rewrite(&caps[2]) {
                Some(proxied) => format!("fetch({quote}{proxied}{quote}"),
                None => caps[0].to_string(),
            }
        })
        .to_string();

    let out = XHR_OPEN_RE
        .replace_all(&out, |caps: &Captures| {
            let (mq, method, uq) = (&caps[1], &caps[2], &caps[3]);
            match ctx.rewrite(&caps[4]) {
                Some(proxied) => format!(".open({mq}{method}{mq}, {uq}{proxied}{uq}"),
                None => caps[0].to_string(),
            }
        })
        .to_string();

    let out = HTTP_VERB_RE
        .replace_all(&out, |caps: &Captures| {
            let (call, quote) = (&caps[1], &caps[2]);
            match ctx.rewrite(&caps[3]) {
                Some(proxied) => format!("{call}({quote}{proxied}{quote}"),
                None => caps[0].to_string(),
            }
        })
        .to_string();

    let out = WEBSOCKET_RE
        .replace_all(&out, |caps: &Captures| {
            let quote = &caps[1];
            // WebSocket endpoints are relayed over HTTP(S); swap the
            // scheme before building the proxied reference.
            let http_equiv = to_http_scheme(&caps[2]);
            match ctx.rewrite(&http_equiv) {
                Some(proxied) => format!("new WebSocket({quote}{proxied}{quote}"),
                None => caps[0].to_string(),
            }
        })
        .to_string();

    LOCATION_RE
        .replace_all(&out, |caps: &Captures| {
            let (lhs, quote) = (&caps[1], &caps[2]);
            match ctx.rewrite(&caps[3]) {
                Some(proxied) => format!("{lhs}={quote}{proxied}{quote}"),
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

fn to_http_scheme(ws_url: &str) -> String {
    if let Some(rest) = ws_url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = ws_url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        ws_url.to_string()
    }
}
