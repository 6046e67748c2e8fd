//! Stylesheet asset-URL rewriting.
//!
//! Rewrites `url(...)` values in global stylesheets so relative asset
//! references resolve against the configured base href and deploy URL.
//!
//! Prefix handling:
//! - `^` bypasses rewriting entirely; the remainder is emitted verbatim.
//! - `~` marks a module-relative reference; the prefix is stripped and
//!   the remainder rewritten like any relative URL.
//! - Absolute URLs (scheme, protocol-relative, `data:`, fragments) and
//!   root-relative URLs (leading `/`) are final and never re-prefixed,
//!   which makes the transform idempotent.

use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// Options controlling URL rewriting for one stylesheet group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlRewriteOptions {
    /// Document base href, e.g. `/app/`.
    pub base_href: String,
    /// Deploy URL prepended to asset references, e.g. `cdn/`.
    pub deploy_url: String,
}

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r#"url\(\s*(?:"([^"]+)"|'([^']+)'|([^)"']+?))\s*\)"#).expect("valid regex")
    })
}

/// Rewrite every `url(...)` occurrence in a stylesheet.
///
/// Unmodified references keep their original spelling (including quote
/// style); rewritten ones are re-quoted. A per-pass cache collapses
/// repeated references to the same URL.
pub fn rewrite_css_urls(css: &str, options: &UrlRewriteOptions) -> String {
    let mut cache: FxHashMap<String, String> = FxHashMap::default();
    let mut result = String::with_capacity(css.len());
    let mut last_end = 0;

    for capture in url_regex().captures_iter(css) {
        let whole = capture.get(0).expect("group 0 always present");
        let original = capture
            .get(1)
            .or_else(|| capture.get(2))
            .or_else(|| capture.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();

        result.push_str(&css[last_end..whole.start()]);

        let processed = cache
            .entry(original.to_string())
            .or_insert_with(|| process_url(original, options))
            .clone();

        if processed == original {
            result.push_str(whole.as_str());
        } else {
            result.push_str(&wrap_url(&processed));
        }
        last_end = whole.end();
    }

    result.push_str(&css[last_end..]);
    result
}

/// Rewrite one URL value.
fn process_url(input: &str, options: &UrlRewriteOptions) -> String {
    // Absolute, protocol-relative, data, and fragment URLs are left as is.
    if is_absolute(input) {
        return input.to_string();
    }

    // Caret prefix bypasses asset processing.
    if let Some(rest) = input.strip_prefix('^') {
        return rest.to_string();
    }

    let input = input.strip_prefix('~').unwrap_or(input);

    // Root-relative URLs are final; re-prefixing them would double-apply
    // on a second pass.
    if input.starts_with('/') {
        return input.to_string();
    }

    dedupe_slashes(&format!(
        "/{}/{}/{}",
        options.base_href, options.deploy_url, input
    ))
}

fn is_absolute(url: &str) -> bool {
    if url.starts_with("//") || url.starts_with("data:") || url.starts_with('#') {
        return true;
    }
    // scheme://
    url.split_once("://")
        .map(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'))
        .unwrap_or(false)
}

fn dedupe_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut previous_slash = false;
    for ch in url.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(ch);
    }
    out
}

fn wrap_url(url: &str) -> String {
    if url.contains('\'') {
        format!("url(\"{}\")", url)
    } else {
        format!("url('{}')", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> UrlRewriteOptions {
        UrlRewriteOptions {
            base_href: "/app/".into(),
            deploy_url: "cdn/".into(),
        }
    }

    #[test]
    fn relative_url_gets_base_and_deploy_prefix() {
        let css = ".a { background: url(foo.png); }";
        let rewritten = rewrite_css_urls(css, &options());
        assert_eq!(rewritten, ".a { background: url('/app/cdn/foo.png'); }");
    }

    #[test]
    fn rewriting_is_idempotent() {
        let css = ".a { background: url(foo.png); }";
        let once = rewrite_css_urls(css, &options());
        let twice = rewrite_css_urls(&once, &options());
        assert_eq!(once, twice);
    }

    #[test]
    fn root_relative_url_is_never_doubly_prefixed() {
        let css = ".a { background: url(/assets/foo.png); }";
        assert_eq!(rewrite_css_urls(css, &options()), css);
    }

    #[test]
    fn caret_prefix_bypasses_rewriting() {
        let css = ".a { background: url(^raw/path.png); }";
        let rewritten = rewrite_css_urls(css, &options());
        assert_eq!(rewritten, ".a { background: url('raw/path.png'); }");
    }

    #[test]
    fn tilde_prefix_is_stripped_then_rewritten() {
        let css = ".a { background: url('~pkg/icon.svg'); }";
        let rewritten = rewrite_css_urls(css, &options());
        assert_eq!(rewritten, ".a { background: url('/app/cdn/pkg/icon.svg'); }");
    }

    #[test]
    fn absolute_and_data_urls_pass_through() {
        let css = ".a { background: url(https://cdn.example/x.png), url(data:image/png;base64,AAAA), url(#frag); }";
        assert_eq!(rewrite_css_urls(css, &options()), css);
    }

    #[test]
    fn quoted_urls_are_handled() {
        let css = r#".a { background: url("foo.png"); }"#;
        let rewritten = rewrite_css_urls(css, &options());
        assert_eq!(rewritten, ".a { background: url('/app/cdn/foo.png'); }");
    }

    #[test]
    fn slashes_are_deduped_in_joined_urls() {
        let opts = UrlRewriteOptions {
            base_href: "/app/".into(),
            deploy_url: "/".into(),
        };
        let rewritten = rewrite_css_urls(".a { background: url(foo.png); }", &opts);
        assert_eq!(rewritten, ".a { background: url('/app/foo.png'); }");
    }
}
