//! Content transformation subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream response
//!     → classify Content-Type (ContentKind)
//!     → html.rs  (markup: security strip, attributes, inline CSS/JS,
//!                 shim injection, base tag)
//!     → css.rs   (url(...) references)
//!     → js.rs    (literal fetch/XHR/WebSocket/location call sites)
//!     → passthrough (other text, binary)
//! ```
//!
//! # Design Decisions
//! - Regex passes, not a parser; each pass is a single `replace_all`
//!   whose pattern covers every URL form at once, so a pass never
//!   revisits its own output
//! - References are emitted as `{prefix}/{percent-encoded absolute URL}`
//!   with an encode set matching ECMAScript's encodeURIComponent, so
//!   decoding the path segment recovers the target exactly

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

pub mod css;
pub mod html;
pub mod js;
pub mod shim;

/// Characters left intact by encodeURIComponent: alphanumerics plus
/// `- _ . ! ~ * ' ( )`.
pub const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a URL for embedding as a single proxy path segment.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Response body classification by upstream Content-Type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    Js,
    Other,
}

impl ContentKind {
    /// Classify an upstream Content-Type header value.
    pub fn classify(content_type: &str) -> Self {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("text/html") || ct.contains("application/xhtml") {
            ContentKind::Html
        } else if ct.contains("javascript") || ct.contains("ecmascript") {
            ContentKind::Js
        } else if ct.contains("text/css") {
            ContentKind::Css
        } else {
            ContentKind::Other
        }
    }
}

/// Per-request rewriting state, derived once from the resolved target.
///
/// Immutable after construction. `base` is the directory form of the
/// target used to resolve relative references: a path whose last segment
/// has no extension is treated as a directory, matching how sites
/// structure app routes.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    prefix: String,
    target: Url,
    base: Url,
}

impl RewriteContext {
    pub fn new(prefix: impl Into<String>, target: Url) -> Self {
        let mut base = target.clone();
        base.set_query(None);
        base.set_fragment(None);
        let path = base.path().to_string();
        if !path.ends_with('/') {
            let last = path.rsplit('/').next().unwrap_or("");
            if last.contains('.') {
                if let Ok(dir) = base.join(".") {
                    base = dir;
                }
            } else {
                base.set_path(&format!("{}/", path));
            }
        }

        Self {
            prefix: prefix.into(),
            target,
            base,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Resolution base as a string, for embedding in the runtime shim.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// The proxied form of the full target URL.
    pub fn encoded_target(&self) -> String {
        encode_component(self.target.as_str())
    }

    /// Build the proxied reference for an already-absolute URL.
    pub fn proxy_reference(&self, absolute: &str) -> String {
        format!("{}/{}", self.prefix, encode_component(absolute))
    }

    /// Turn a raw reference into an absolute URL, or None if it is not
    /// something the proxy should touch (fragments, data/blob/javascript
    /// schemes, references already pointing at this proxy).
    pub fn absolutize(&self, raw: &str) -> Option<String> {
        if raw.is_empty()
            || raw.starts_with('#')
            || raw.starts_with("data:")
            || raw.starts_with("blob:")
            || raw.starts_with("javascript:")
            || raw.starts_with("mailto:")
        {
            return None;
        }
        if raw.strip_prefix(&self.prefix).is_some_and(|r| r.starts_with('/')) {
            return None;
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            Some(raw.to_string())
        } else if let Some(rest) = raw.strip_prefix("//") {
            Some(format!("{}://{}", self.target.scheme(), rest))
        } else {
            self.base.join(raw).ok().map(|u| u.to_string())
        }
    }

    /// Full rewrite: absolutize, then wrap in the proxy path.
    pub fn rewrite(&self, raw: &str) -> Option<String> {
        self.absolutize(raw).map(|abs| self.proxy_reference(&abs))
    }
}

/// Apply the transform for a classified text body.
pub fn transform_text(kind: ContentKind, body: &str, ctx: &RewriteContext) -> String {
    match kind {
        ContentKind::Html => html::rewrite_html(body, ctx),
        ContentKind::Css => css::rewrite_url_functions(body, ctx),
        ContentKind::Js => js::rewrite_script_calls(body, ctx),
        ContentKind::Other => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(prefix: &str, target: &str) -> RewriteContext {
        RewriteContext::new(prefix, Url::parse(target).unwrap())
    }

    #[test]
    fn encode_matches_encode_uri_component() {
        assert_eq!(
            encode_component("https://example.com/img/a.png"),
            "https%3A%2F%2Fexample.com%2Fimg%2Fa.png"
        );
        // The characters encodeURIComponent leaves alone survive.
        assert_eq!(encode_component("a-b_c.d!e~f*g'h(i)j"), "a-b_c.d!e~f*g'h(i)j");
        assert_eq!(encode_component("a b"), "a%20b");
    }

    #[test]
    fn round_trip_through_percent_decoding() {
        let original = "https://example.com/path?q=1&r=two words#frag";
        let encoded = encode_component(original);
        let decoded = percent_encoding::percent_decode_str(&encoded)
            .decode_utf8()
            .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn classify_content_kinds() {
        assert_eq!(ContentKind::classify("text/html; charset=utf-8"), ContentKind::Html);
        assert_eq!(ContentKind::classify("application/xhtml+xml"), ContentKind::Html);
        assert_eq!(ContentKind::classify("application/javascript"), ContentKind::Js);
        assert_eq!(ContentKind::classify("text/javascript"), ContentKind::Js);
        assert_eq!(ContentKind::classify("application/ecmascript"), ContentKind::Js);
        assert_eq!(ContentKind::classify("text/css"), ContentKind::Css);
        assert_eq!(ContentKind::classify("application/json"), ContentKind::Other);
        assert_eq!(ContentKind::classify("image/png"), ContentKind::Other);
    }

    #[test]
    fn absolutize_forms() {
        let ctx = ctx("/light", "https://example.com/dir/page.html");
        assert_eq!(
            ctx.absolutize("https://other.org/x").as_deref(),
            Some("https://other.org/x")
        );
        assert_eq!(
            ctx.absolutize("//cdn.example.com/lib.js").as_deref(),
            Some("https://cdn.example.com/lib.js")
        );
        assert_eq!(
            ctx.absolutize("/img/a.png").as_deref(),
            Some("https://example.com/img/a.png")
        );
        assert_eq!(
            ctx.absolutize("sibling.html").as_deref(),
            Some("https://example.com/dir/sibling.html")
        );
    }

    #[test]
    fn extensionless_path_is_a_directory() {
        let ctx = ctx("/light", "https://example.com/app");
        assert_eq!(
            ctx.absolutize("page.html").as_deref(),
            Some("https://example.com/app/page.html")
        );
    }

    #[test]
    fn untouchable_references() {
        let ctx = ctx("/light", "https://example.com/");
        assert!(ctx.absolutize("").is_none());
        assert!(ctx.absolutize("#top").is_none());
        assert!(ctx.absolutize("data:image/png;base64,AAAA").is_none());
        assert!(ctx.absolutize("blob:https://example.com/x").is_none());
        assert!(ctx.absolutize("javascript:void(0)").is_none());
        assert!(ctx.absolutize("mailto:a@example.com").is_none());
        // Already-proxied references are left alone.
        assert!(ctx.absolutize("/light/https%3A%2F%2Fexample.com").is_none());
    }

    #[test]
    fn rewrite_wraps_in_prefix() {
        let ctx = ctx("/light", "https://example.com/");
        assert_eq!(
            ctx.rewrite("/a/b").as_deref(),
            Some("/light/https%3A%2F%2Fexample.com%2Fa%2Fb")
        );
    }
}
