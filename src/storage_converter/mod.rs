//! Storage format to Markdown.
//!
//! The storage markup is parsed into a tree, read into the document model
//! (vendor macros included, see [`macros`]) and rendered as Markdown.
//! Conversion never fails; malformed markup yields best-effort text.

pub mod macros;

use crate::document::{MarkdownRenderer, TreeReader};
use crate::markup::parse_fragment;
use crate::sanitizer::HtmlSanitizer;

/// Converts storage format to Markdown.
#[derive(Debug, Clone, Default)]
pub struct StorageConverter {
    renderer: MarkdownRenderer,
    sanitizer: Option<HtmlSanitizer>,
}

impl StorageConverter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize input before conversion (for content from untrusted sources)
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: HtmlSanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Number ordered lists instead of rendering them as bullets
    #[must_use]
    pub fn with_numbered_lists(mut self, numbered: bool) -> Self {
        self.renderer = self.renderer.with_numbered_lists(numbered);
        self
    }

    #[must_use]
    pub fn convert(&self, storage: &str) -> String {
        let nodes = match &self.sanitizer {
            Some(sanitizer) => sanitizer.sanitize_nodes(parse_fragment(storage)).0,
            None => parse_fragment(storage),
        };
        let blocks = TreeReader::default().read(&nodes);
        self.renderer.render(&blocks)
    }
}

/// Convert storage format to Markdown with default settings.
#[must_use]
pub fn to_markdown(storage: &str) -> String {
    StorageConverter::new().convert(storage)
}
