//! Standalone HTML documents for export.

use std::sync::LazyLock;

use html_escape::encode_text;
use regex::{Captures, Regex};

use crate::sanitizer::{HtmlSanitizer, export_policy};
use crate::utils::resolve_url;

// src/href attributes whose value is rooted at /wiki/
static WIKI_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s(?:src|href)\s*=\s*)(?:"(/wiki/[^"]*)"|'(/wiki/[^']*)')"#)
        .expect("WIKI_REF_RE: hardcoded regex is valid")
});

const EXPORT_STYLESHEET: &str = r"
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #172b4d; max-width: 960px; margin: 0 auto; padding: 2rem; }
    h1, h2, h3, h4, h5, h6 { line-height: 1.25; margin-top: 1.5em; }
    pre, code { font-family: SFMono-Regular, Menlo, Consolas, monospace; background: #f4f5f7; border-radius: 3px; }
    pre { padding: 1em; overflow-x: auto; white-space: pre-wrap; }
    code { padding: 0.1em 0.3em; }
    table { border-collapse: collapse; width: 100%; margin: 1em 0; }
    th, td { border: 1px solid #c1c7d0; padding: 0.5em 0.75em; text-align: left; vertical-align: top; }
    th { background: #f4f5f7; }
    blockquote { border-left: 4px solid #dfe1e6; margin: 1em 0; padding: 0 1em; color: #5e6c84; }
    img { max-width: 100%; height: auto; }
    a { color: #0052cc; }
    @media print {
      body { max-width: none; padding: 0; }
      a { color: inherit; text-decoration: underline; }
      pre, blockquote, table, img { page-break-inside: avoid; }
      h1, h2, h3 { page-break-after: avoid; }
    }
";

/// Wrap `body` into a complete HTML document.
///
/// The body is sanitized with the export policy first: scripts, event
/// handlers and dangerous URLs never reach the file, inlined raster images
/// do. Root-relative `/wiki/...` references in `src` and `href` attributes are
/// then made absolute against `base_url`, so the file works outside the site.
#[must_use]
pub fn assemble_html(body: &str, title: &str, base_url: &str, styled: bool) -> String {
    let title = encode_text(title);
    let body = HtmlSanitizer::new(export_policy()).sanitize(body);
    let body = absolutize_wiki_links(&body, base_url);

    let mut doc = String::with_capacity(body.len() + EXPORT_STYLESHEET.len() + 512);
    doc.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    doc.push_str("  <meta charset=\"utf-8\">\n");
    doc.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    doc.push_str("  <title>");
    doc.push_str(&title);
    doc.push_str("</title>\n");
    if styled {
        doc.push_str("  <style>");
        doc.push_str(EXPORT_STYLESHEET);
        doc.push_str("  </style>\n");
    }
    doc.push_str("</head>\n<body>\n<div class=\"confluence-export\">\n<h1>");
    doc.push_str(&title);
    doc.push_str("</h1>\n");
    doc.push_str(&body);
    doc.push_str("\n</div>\n</body>\n</html>\n");
    doc
}

/// Rewrite `/wiki/...` rooted `src`/`href` values to absolute URLs.
///
/// Values that fail to resolve are left as they are.
#[must_use]
pub fn absolutize_wiki_links(html: &str, base_url: &str) -> String {
    WIKI_REF_RE
        .replace_all(html, |caps: &Captures<'_>| {
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            let (value, quote) = match (caps.get(2), caps.get(3)) {
                (Some(value), _) => (value.as_str(), '"'),
                (None, Some(value)) => (value.as_str(), '\''),
                (None, None) => return caps[0].to_string(),
            };
            match resolve_url(base_url, value) {
                Ok(absolute) => format!("{prefix}{quote}{absolute}{quote}"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.atlassian.net/wiki";

    #[test]
    fn test_document_shell() {
        let doc = assemble_html("<p>Body</p>", "Q&A <draft>", BASE, true);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<meta charset=\"utf-8\">"));
        assert!(doc.contains("name=\"viewport\""));
        assert!(doc.contains("<title>Q&amp;A &lt;draft&gt;</title>"));
        assert!(doc.contains("<style>"));
        assert!(doc.contains("@media print"));
        assert!(doc.contains("<p>Body</p>"));
        assert!(doc.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_body_is_sanitized() {
        let doc = assemble_html(
            r#"<p onclick="x()">a</p><script>alert(1)</script><a href="javascript:alert(2)">b</a>"#,
            "T",
            BASE,
            false,
        );
        assert!(doc.contains("<p>a</p>"));
        assert!(!doc.contains("alert"));
        assert!(!doc.contains("onclick"));
    }

    #[test]
    fn test_unstyled_has_no_stylesheet() {
        let doc = assemble_html("<p>Body</p>", "T", BASE, false);
        assert!(!doc.contains("<style>"));
    }

    #[test]
    fn test_wiki_links_absolutized() {
        let html = r#"<a href="/wiki/spaces/ENG">x</a><img src='/wiki/download/a.png'><a href="/other">y</a>"#;
        let out = absolutize_wiki_links(html, BASE);
        assert!(out.contains(r#"href="https://example.atlassian.net/wiki/spaces/ENG""#));
        assert!(out.contains("src='https://example.atlassian.net/wiki/download/a.png'"));
        assert!(out.contains(r#"href="/other""#));
    }

    #[test]
    fn test_unresolvable_base_leaves_links() {
        let html = r#"<a href="/wiki/x">x</a>"#;
        assert_eq!(absolutize_wiki_links(html, "not a url"), html);
    }
}
