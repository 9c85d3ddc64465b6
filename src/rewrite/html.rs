//! HTML document rewriting.
//!
//! Pass order is fixed so output is reproducible for identical input:
//! security markup stripping, then URL-bearing attributes, then inline
//! CSS, then inline script literals, then shim injection, then the base
//! tag. The shim and base tag are inserted after the rewriting passes so
//! their own contents are never re-matched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::rewrite::{css, js, shim, RewriteContext};

static BLOCKING_META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)<meta[^>]*http-equiv=["'](?:Content-Security-Policy|X-Frame-Options|Referrer-Policy)["'][^>]*>"#,
    )
    .expect("valid blocking meta regex")
});

static CSP_FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)content-security-policy[^;]*;?").expect("valid CSP fragment regex"));

static SCRIPT_NONCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<script[^>]*?)\s+nonce\s*=\s*["'][^"']*["']"#).expect("valid nonce regex")
});

// The leading whitespace keeps composite names like data-src from
// matching on their suffix.
static URL_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(\s)(href|src|action|cite|data|formaction|poster|background)\s*=\s*(["'])((?:https?://|//|/)[^"']*)["']"#,
    )
    .expect("valid URL attribute regex")
});

static BASE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<base\b[^>]*>").expect("valid base tag regex"));

static HEAD_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head\b[^>]*>").expect("valid head open regex"));

static HEAD_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</head>").expect("valid head close regex"));

static BODY_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<body").expect("valid body open regex"));

/// Rewrite a full HTML document for proxied delivery.
pub fn rewrite_html(input: &str, ctx: &RewriteContext) -> String {
    let out = strip_security_markup(input);
    let out = rewrite_url_attributes(&out, ctx);
    let out = css::rewrite_url_functions(&out, ctx);
    let out = js::rewrite_script_calls(&out, ctx);
    let out = inject_shim(&out, ctx);
    apply_base_tag(&out, ctx)
}

/// Remove markup that would keep the rewritten document from rendering
/// when served from the proxy's origin: CSP / frame / referrer policy
/// meta tags, stray CSP directive fragments, and script nonces that no
/// longer match any policy.
fn strip_security_markup(input: &str) -> String {
    let out = BLOCKING_META_RE.replace_all(input, "");
    let out = CSP_FRAGMENT_RE.replace_all(&out, "");
    SCRIPT_NONCE_RE.replace_all(&out, "$1").to_string()
}

fn rewrite_url_attributes(input: &str, ctx: &RewriteContext) -> String {
    URL_ATTR_RE
        .replace_all(input, |caps: &Captures| {
            let (ws, attr, quote) = (&caps[1], &caps[2], &caps[3]);
            match ctx.rewrite(&caps[4]) {
                Some(proxied) => format!("{ws}{attr}={quote}{proxied}{quote}"),
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

/// Place the runtime shim before `</head>`, else before `<body`, else at
/// the very front of the document.
fn inject_shim(input: &str, ctx: &RewriteContext) -> String {
    let script = shim::shim_script(ctx.prefix(), ctx.base_url());
    if HEAD_CLOSE_RE.is_match(input) {
        return HEAD_CLOSE_RE
            .replace(input, |_: &Captures| format!("{script}</head>"))
            .to_string();
    }
    if let Some(m) = BODY_OPEN_RE.find(input) {
        let mut out = String::with_capacity(input.len() + script.len());
        out.push_str(&input[..m.start()]);
        out.push_str(&script);
        out.push_str(&input[m.start()..]);
        return out;
    }
    format!("{script}{input}")
}

/// Insert or replace `<base>` so references the rewriting passes missed
/// still resolve through the proxy via the browser's own resolution.
fn apply_base_tag(input: &str, ctx: &RewriteContext) -> String {
    let base_tag = format!(
        r#"<base href="{}/{}/">"#,
        ctx.prefix(),
        ctx.encoded_target()
    );
    if BASE_TAG_RE.is_match(input) {
        return BASE_TAG_RE
            .replace_all(input, |_: &Captures| base_tag.clone())
            .to_string();
    }
    HEAD_OPEN_RE
        .replace(input, |caps: &Captures| format!("{}{base_tag}", &caps[0]))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::encode_component;
    use url::Url;

    fn ctx() -> RewriteContext {
        RewriteContext::new("/light", Url::parse("https://example.com/app/").unwrap())
    }

    fn proxied(url: &str) -> String {
        format!("/light/{}", encode_component(url))
    }

    #[test]
    fn strips_blocking_meta_tags() {
        let input = concat!(
            r#"<head><meta http-equiv="Content-Security-Policy" content="default-src 'self'">"#,
            r#"<meta http-equiv="X-Frame-Options" content="DENY">"#,
            r#"<meta http-equiv="Referrer-Policy" content="no-referrer">"#,
            r#"<meta charset="utf-8"></head>"#,
        );
        let out = strip_security_markup(input);
        assert!(!out.contains("Content-Security-Policy"));
        assert!(!out.contains("X-Frame-Options"));
        assert!(!out.contains("Referrer-Policy"));
        assert!(out.contains(r#"<meta charset="utf-8">"#));
    }

    #[test]
    fn strips_script_nonces() {
        let out = strip_security_markup(r#"<script nonce="abc123" src="/a.js"></script>"#);
        assert_eq!(out, r#"<script src="/a.js"></script>"#);
    }

    #[test]
    fn rewrites_attribute_url_forms() {
        let input = concat!(
            r#"<a href="https://example.com/page">x</a>"#,
            r#"<img src="/logo.png">"#,
            r#"<script src="//cdn.example.com/lib.js"></script>"#,
            r#"<form action="/submit" method="post"></form>"#,
            r#"<video poster="/poster.jpg"></video>"#,
        );
        let out = rewrite_url_attributes(input, &ctx());
        assert!(out.contains(&format!(r#"href="{}""#, proxied("https://example.com/page"))));
        assert!(out.contains(&format!(r#"src="{}""#, proxied("https://example.com/logo.png"))));
        assert!(out.contains(&format!(
            r#"src="{}""#,
            proxied("https://cdn.example.com/lib.js")
        )));
        assert!(out.contains(&format!(
            r#"action="{}""#,
            proxied("https://example.com/submit")
        )));
        assert!(out.contains(&format!(
            r#"poster="{}""#,
            proxied("https://example.com/poster.jpg")
        )));
    }

    #[test]
    fn leaves_fragments_and_data_uris() {
        let input = r##"<a href="#section">x</a><img src="data:image/png;base64,AA">"##;
        assert_eq!(rewrite_url_attributes(input, &ctx()), input);
    }

    #[test]
    fn leaves_bare_relative_attributes_for_base_tag() {
        let input = r#"<a href="sub/page.html">x</a>"#;
        assert_eq!(rewrite_url_attributes(input, &ctx()), input);
    }

    #[test]
    fn data_attribute_rewritten_but_not_data_dash() {
        let input = r#"<object data="/movie.swf"></object><img data-src="/lazy.png">"#;
        let out = rewrite_url_attributes(input, &ctx());
        assert!(out.contains(&format!(r#"data="{}""#, proxied("https://example.com/movie.swf"))));
        assert!(out.contains(r#"data-src="/lazy.png""#));
    }

    #[test]
    fn shim_goes_before_head_close() {
        let out = rewrite_html("<html><head><title>t</title></head><body></body></html>", &ctx());
        let shim_at = out.find(shim::SHIM_MARKER).unwrap();
        let head_close_at = out.find("</head>").unwrap();
        assert!(shim_at < head_close_at);
    }

    #[test]
    fn shim_falls_back_to_body_then_prepend() {
        let out = rewrite_html("<body><p>x</p></body>", &ctx());
        assert!(out.find(shim::SHIM_MARKER).unwrap() < out.find("<body>").unwrap());

        let out = rewrite_html("<p>bare fragment</p>", &ctx());
        assert!(out.starts_with("<script data-proxy-shim>"));
    }

    #[test]
    fn base_tag_inserted_after_head_open() {
        let out = rewrite_html("<html><head><title>t</title></head><body></body></html>", &ctx());
        let expected = format!(
            r#"<head><base href="/light/{}/">"#,
            encode_component("https://example.com/app/")
        );
        assert!(out.contains(&expected));
    }

    #[test]
    fn existing_base_tag_replaced() {
        let out = rewrite_html(
            r#"<html><head><base href="https://example.com/old/"></head><body></body></html>"#,
            &ctx(),
        );
        assert!(!out.contains("https://example.com/old/"));
        assert!(out.contains(&format!(
            r#"<base href="/light/{}/">"#,
            encode_component("https://example.com/app/")
        )));
    }

    #[test]
    fn single_pass_produces_no_nested_prefixes() {
        let input = r#"<html><head></head><body><a href="https://example.com/a">a</a><img src="/b.png"></body></html>"#;
        let out = rewrite_html(input, &ctx());
        assert!(!out.contains("/light/%2Flight"));
        assert!(!out.contains("/light//light"));
        assert!(!out.contains(&encode_component("/light/https")));
    }

    #[test]
    fn round_trip_recovers_embedded_url() {
        let input = r#"<a href="https://example.com/x?y=1">x</a>"#;
        let out = rewrite_url_attributes(input, &ctx());
        let encoded = encode_component("https://example.com/x?y=1");
        assert!(out.contains(&format!(r#"href="/light/{encoded}""#)));
        let decoded = percent_encoding::percent_decode_str(&encoded)
            .decode_utf8()
            .unwrap();
        assert_eq!(decoded, "https://example.com/x?y=1");
    }

    #[test]
    fn inline_styles_and_scripts_covered() {
        let input = concat!(
            r#"<html><head><style>.h { background: url(/bg.png); }</style>"#,
            r#"<script>fetch("/api/data");</script></head><body></body></html>"#,
        );
        let out = rewrite_html(input, &ctx());
        assert!(out.contains(&format!(
            r#"url("{}")"#,
            proxied("https://example.com/bg.png")
        )));
        assert!(out.contains(&format!(r#"fetch("{}""#, proxied("https://example.com/api/data"))));
    }
}
