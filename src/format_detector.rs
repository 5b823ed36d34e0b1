//! Content format classification.
//!
//! Pure heuristics over the raw text: block-level HTML or a macro namespace
//! means storage format; recognizable Markdown syntax means Markdown; anything
//! else is plain text. Bare `<`/`>` characters never count as markup unless
//! they form a tag.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:p|h[1-6]|ul|ol|table)(?:\s[^<>]*)?/?>")
        .expect("BLOCK_TAG_RE: hardcoded regex is valid")
});

static MACRO_NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:ac|ri):[a-z][a-z-]*").expect("MACRO_NAMESPACE_RE: hardcoded regex is valid")
});

static INLINE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:a|b|i|u|s|em|strong|code|pre|br|hr|blockquote|li|tr|td|th|thead|tbody|img|div|span|sub|sup|del)(?:\s[^<>]*)?/?>",
    )
    .expect("INLINE_TAG_RE: hardcoded regex is valid")
});

static MARKDOWN_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^ {0,3}(?:#{1,6}\s|[*+-]\s+\S|\d{1,9}[.)]\s+\S|>|```|~~~|\|.*\|\s*$)")
        .expect("MARKDOWN_BLOCK_RE: hardcoded regex is valid")
});

static MARKDOWN_INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*\S[^*]*\*\*|__\S[^_]*__|!?\[[^\]\n]+\]\([^)\s]+\)|`[^`\n]+`")
        .expect("MARKDOWN_INLINE_RE: hardcoded regex is valid")
});

/// Detected representation of a content blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    StorageFormat,
    Markdown,
    PlainText,
}

/// Raw content together with its detected format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDocument {
    raw: String,
    detected_format: Format,
}

impl MarkupDocument {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let detected_format = detect(&raw);
        Self {
            raw,
            detected_format,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn detected_format(&self) -> Format {
        self.detected_format
    }

    #[must_use]
    pub fn into_raw(self) -> String {
        self.raw
    }
}

/// Classify content as storage format, Markdown or plain text.
#[must_use]
pub fn detect(content: &str) -> Format {
    if looks_like_storage(content) {
        return Format::StorageFormat;
    }
    if MARKDOWN_BLOCK_RE.is_match(content) || MARKDOWN_INLINE_RE.is_match(content) {
        return Format::Markdown;
    }
    Format::PlainText
}

fn looks_like_storage(content: &str) -> bool {
    if !content.contains('<') {
        return false;
    }
    BLOCK_TAG_RE.is_match(content)
        || MACRO_NAMESPACE_RE.is_match(content)
        || INLINE_TAG_RE.is_match(content)
}
