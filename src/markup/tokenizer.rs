//! Regex-driven tag stream tokenizer.
//!
//! Splits markup into start tags, end tags, text, CDATA sections and raw-text
//! elements. Anything that does not form a recognizable tag is returned as
//! text, so the tokenizer never fails. The `regex` crate runs in linear time,
//! which keeps adversarial input from causing catastrophic backtracking.

use regex::Regex;
use std::sync::LazyLock;

// Alternatives, in priority order:
//   comment, CDATA section, declaration/doctype, processing instruction,
//   end tag (capture 1), start tag (capture 2 = name, capture 3 = attributes)
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?(?:-->|\z)|<!\[CDATA\[.*?(?:\]\]>|\z)|<![^>]*(?:>|\z)|<\?[^>]*(?:>|\z)|</([A-Za-z][^\s/>]*)[^>]*>|<([A-Za-z][^\s/>"'=<]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#,
    )
    .expect("TAG_RE: hardcoded regex is valid")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("ATTR_RE: hardcoded regex is valid")
});

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// A single attribute with its value still entity-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    pub name: String,
    pub value: &'a str,
}

/// One token of the tag stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Character data with entities not yet decoded
    Text(&'a str),
    StartTag {
        name: String,
        attrs: Vec<RawAttribute<'a>>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    /// Body of a `<![CDATA[...]]>` section
    CData(&'a str),
    /// A raw-text element (`script`, `style`) together with its content
    RawText {
        name: String,
        attrs: Vec<RawAttribute<'a>>,
        text: &'a str,
    },
    /// Comments, doctypes and processing instructions
    Ignored,
}

/// Tokenize markup into a tag stream.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let Some(caps) = TAG_RE.captures(&input[pos..]) else {
            tokens.push(Token::Text(&input[pos..]));
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };

        let start = pos + whole.start();
        let end = pos + whole.end();
        if start > pos {
            tokens.push(Token::Text(&input[pos..start]));
        }

        let matched = whole.as_str();
        if matched.starts_with("<!--") || matched.starts_with("<?") {
            tokens.push(Token::Ignored);
        } else if let Some(body) = matched.strip_prefix("<![CDATA[") {
            tokens.push(Token::CData(body.strip_suffix("]]>").unwrap_or(body)));
        } else if matched.starts_with("<!") {
            tokens.push(Token::Ignored);
        } else if let Some(name) = caps.get(1) {
            tokens.push(Token::EndTag {
                name: name.as_str().to_ascii_lowercase(),
            });
        } else if let Some(name) = caps.get(2) {
            let name = name.as_str().to_ascii_lowercase();
            let raw_attrs = caps.get(3).map_or("", |m| m.as_str());
            let (attrs, self_closing) = parse_attributes(raw_attrs);

            if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                let (text_end, after) = find_raw_text_end(input, end, &name);
                tokens.push(Token::RawText {
                    name,
                    attrs,
                    text: &input[end..text_end],
                });
                pos = after;
                continue;
            }

            tokens.push(Token::StartTag {
                name,
                attrs,
                self_closing,
            });
        }

        pos = end;
    }

    tokens
}

/// Parse the attribute section of a start tag.
///
/// Returns the attributes (first occurrence wins, names lowercased) and whether
/// the tag was written self-closing.
fn parse_attributes(raw: &str) -> (Vec<RawAttribute<'_>>, bool) {
    let trimmed = raw.trim_end();
    let (source, self_closing) = match trimmed.strip_suffix('/') {
        Some(rest)
            if rest.is_empty()
                || rest.ends_with(|c: char| c.is_whitespace() || c == '"' || c == '\'') =>
        {
            (rest, true)
        }
        _ => (trimmed, false),
    };

    let mut attrs: Vec<RawAttribute<'_>> = Vec::new();
    for caps in ATTR_RE.captures_iter(source) {
        let Some(name) = caps.get(1) else { continue };
        let name = name.as_str().to_ascii_lowercase();
        if attrs.iter().any(|a| a.name == name) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        attrs.push(RawAttribute { name, value });
    }

    (attrs, self_closing)
}

/// Locate the end of a raw-text element's content.
///
/// Returns `(content_end, position_after_end_tag)`. An unterminated element
/// runs to the end of input.
fn find_raw_text_end(input: &str, from: usize, name: &str) -> (usize, usize) {
    let bytes = input.as_bytes();
    let mut search = from;

    while let Some(offset) = input[search..].find("</") {
        let tag_start = search + offset;
        let name_start = tag_start + 2;
        let name_end = name_start + name.len();

        let name_matches = bytes
            .get(name_start..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()));
        let boundary = bytes
            .get(name_end)
            .is_none_or(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/');

        if name_matches && boundary {
            let after = input[name_end..]
                .find('>')
                .map_or(input.len(), |gt| name_end + gt + 1);
            return (tag_start, after);
        }
        search = name_start;
    }

    (input.len(), input.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_stream() {
        let tokens = tokenize(r#"<p class="x">Hello <b>world</b></p>"#);
        assert_eq!(tokens.len(), 6);
        assert!(matches!(&tokens[0], Token::StartTag { name, .. } if name == "p"));
        assert_eq!(tokens[1], Token::Text("Hello "));
        assert!(matches!(&tokens[5], Token::EndTag { name } if name == "p"));
    }

    #[test]
    fn test_namespaced_self_closing() {
        let tokens = tokenize(r#"<ri:page ri:content-title="Home" />"#);
        match &tokens[0] {
            Token::StartTag { name, attrs, self_closing } => {
                assert_eq!(name, "ri:page");
                assert!(*self_closing);
                assert_eq!(attrs[0].name, "ri:content-title");
                assert_eq!(attrs[0].value, "Home");
            }
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn test_cdata_section() {
        let tokens = tokenize("<ac:plain-text-body><![CDATA[a < b && c]]></ac:plain-text-body>");
        assert_eq!(tokens[1], Token::CData("a < b && c"));
    }

    #[test]
    fn test_unterminated_cdata_runs_to_end() {
        let tokens = tokenize("<![CDATA[unfinished");
        assert_eq!(tokens, vec![Token::CData("unfinished")]);
    }

    #[test]
    fn test_script_is_raw_text() {
        let tokens = tokenize("<script>if (a<b) { x('</p>') }</script>after");
        match &tokens[0] {
            Token::RawText { name, text, .. } => {
                assert_eq!(name, "script");
                assert_eq!(*text, "if (a<b) { x('</p>') }");
            }
            other => panic!("unexpected token {other:?}"),
        }
        assert_eq!(tokens[1], Token::Text("after"));
    }

    #[test]
    fn test_raw_text_end_is_case_insensitive() {
        let tokens = tokenize("<style>p{}</STYLE >x");
        assert!(matches!(&tokens[0], Token::RawText { text, .. } if *text == "p{}"));
        assert_eq!(tokens[1], Token::Text("x"));
    }

    #[test]
    fn test_bare_angle_brackets_are_text() {
        let tokens = tokenize("1 < 2 > 0");
        assert_eq!(tokens, vec![Token::Text("1 < 2 > 0")]);
    }

    #[test]
    fn test_unquoted_and_valueless_attributes() {
        let tokens = tokenize("<td colspan=2 nowrap>");
        match &tokens[0] {
            Token::StartTag { attrs, self_closing, .. } => {
                assert!(!*self_closing);
                assert_eq!(attrs[0].name, "colspan");
                assert_eq!(attrs[0].value, "2");
                assert_eq!(attrs[1].name, "nowrap");
                assert_eq!(attrs[1].value, "");
            }
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn test_unquoted_slash_value_is_not_self_closing() {
        let tokens = tokenize("<a href=/x/>");
        match &tokens[0] {
            Token::StartTag { attrs, self_closing, .. } => {
                assert!(!*self_closing);
                assert_eq!(attrs[0].value, "/x/");
            }
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn test_comments_and_doctype_are_ignored() {
        let tokens = tokenize("<!DOCTYPE html><!-- note -->x");
        assert_eq!(tokens, vec![Token::Ignored, Token::Ignored, Token::Text("x")]);
    }
}
