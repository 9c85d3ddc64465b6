//! CSS `url(...)` reference rewriting.
//!
//! Handles quoted, unquoted, absolute, protocol-relative, and
//! root-relative forms in one pass. Applied to standalone stylesheets and
//! to inline CSS inside HTML documents.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::rewrite::RewriteContext;

static CSS_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*["']?((?:https?://|//|/)[^"')]+)["']?\s*\)"#)
        .expect("valid CSS url regex")
});

pub fn rewrite_url_functions(input: &str, ctx: &RewriteContext) -> String {
    CSS_URL_RE
        .replace_all(input, |caps: &Captures| match ctx.rewrite(&caps[1]) {
            Some(proxied) => format!("url(\"{}\")", proxied),
            None => caps[0].to_string(),
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::encode_component;
    use url::Url;

    fn ctx() -> RewriteContext {
        RewriteContext::new(
            "/light",
            Url::parse("https://example.com/dir/page.css").unwrap(),
        )
    }

    #[test]
    fn root_relative_resolves_against_origin() {
        let out = rewrite_url_functions("body { background: url(/img/a.png); }", &ctx());
        let expected = format!(
            "body {{ background: url(\"/light/{}\"); }}",
            encode_component("https://example.com/img/a.png")
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn quoted_absolute_and_protocol_relative() {
        let out = rewrite_url_functions(
            r#".a { background: url("https://cdn.example.com/b.png"); }
               .b { background: url('//cdn.example.com/c.png'); }"#,
            &ctx(),
        );
        assert!(out.contains(&format!(
            "url(\"/light/{}\")",
            encode_component("https://cdn.example.com/b.png")
        )));
        assert!(out.contains(&format!(
            "url(\"/light/{}\")",
            encode_component("https://cdn.example.com/c.png")
        )));
    }

    #[test]
    fn data_uris_left_alone() {
        let input = ".i { background: url(data:image/png;base64,AAAA); }";
        assert_eq!(rewrite_url_functions(input, &ctx()), input);
    }

    #[test]
    fn single_pass_does_not_nest() {
        let once = rewrite_url_functions("a { background: url(/x.png); }", &ctx());
        let twice = rewrite_url_functions(&once, &ctx());
        assert_eq!(once, twice);
        assert!(!twice.contains("/light/%2Flight"));
        assert!(!twice.contains("/light/http%3A%2F%2Flight"));
    }
}
