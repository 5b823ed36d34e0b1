//! Export view HTML to Markdown.
//!
//! The export view is rendered HTML (no macros), so it is parsed with
//! `scraper`, an HTML5 parser, converted into the shared markup tree and read
//! with the same document reader the storage converter uses. Export-specific
//! handling lives in the reader options: `<head>`, `<script>`, `<style>`,
//! `<noscript>` and `<template>` are dropped, and syntax-highlighted `<pre>`
//! blocks keep their language.

use ego_tree::NodeRef;
use scraper::{ElementRef, Html};

use crate::document::{MarkdownRenderer, ReaderOptions, TreeReader};
use crate::markup::{Element, Node};
use crate::utils::constants::MAX_NESTING_DEPTH;

/// Configuration options for export HTML to Markdown conversion
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Preserve tables as pipe tables (default: true)
    ///
    /// When disabled each table row becomes a paragraph of its cell text.
    pub preserve_tables: bool,

    /// Preserve hyperlinks (default: true)
    pub preserve_links: bool,

    /// Preserve images (default: true)
    ///
    /// When disabled images are replaced by their alt text.
    pub preserve_images: bool,

    /// Number ordered lists instead of using bullets (default: false)
    pub number_ordered_lists: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            preserve_tables: true,
            preserve_links: true,
            preserve_images: true,
            number_ordered_lists: false,
        }
    }
}

impl ConversionOptions {
    /// Create a new `ConversionOptions` with all features enabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Structure only: tables, links and images reduced to text
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            preserve_tables: false,
            preserve_links: false,
            preserve_images: false,
            number_ordered_lists: false,
        }
    }

    /// Text-only mode: strips images and links
    #[must_use]
    pub fn text_only() -> Self {
        Self {
            preserve_tables: true,
            preserve_links: false,
            preserve_images: false,
            number_ordered_lists: false,
        }
    }

    fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            preserve_tables: self.preserve_tables,
            preserve_links: self.preserve_links,
            preserve_images: self.preserve_images,
        }
    }
}

/// Convert export HTML to Markdown with default options.
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    html_to_markdown_with(html, &ConversionOptions::default())
}

/// Convert export HTML to Markdown.
#[must_use]
pub fn html_to_markdown_with(html: &str, options: &ConversionOptions) -> String {
    let nodes = parse_export_html(html);
    let blocks = TreeReader::new(options.reader_options()).read(&nodes);
    MarkdownRenderer::new()
        .with_numbered_lists(options.number_ordered_lists)
        .render(&blocks)
}

/// Parse export HTML (a full document or a fragment) into markup nodes.
#[must_use]
pub fn parse_export_html(html: &str) -> Vec<Node> {
    let lower = html.get(..html.len().min(1024)).unwrap_or(html).to_ascii_lowercase();
    let document = if lower.contains("<html") || lower.contains("<!doctype") {
        Html::parse_document(html)
    } else {
        Html::parse_fragment(html)
    };

    let root = document.root_element();
    root.children()
        .filter_map(|child| convert_node(child, 1))
        .collect()
}

fn convert_node(node: NodeRef<'_, scraper::Node>, depth: usize) -> Option<Node> {
    match node.value() {
        scraper::Node::Text(text) => Some(Node::Text(text.to_string())),
        scraper::Node::Element(element) => {
            let name = element.name().to_ascii_lowercase();
            if depth >= MAX_NESTING_DEPTH {
                tracing::debug!("Export HTML nesting limit reached at <{}>", name);
                let text: String = ElementRef::wrap(node)
                    .map(|element| element.text().collect())
                    .unwrap_or_default();
                return Some(Node::Text(text));
            }

            let attrs = element
                .attrs()
                .map(|(key, value)| (key.to_ascii_lowercase(), value.to_string()))
                .collect();
            let children = node
                .children()
                .filter_map(|child| convert_node(child, depth + 1))
                .collect();
            Some(Node::Element(Element {
                name,
                attrs,
                children,
            }))
        }
        _ => None,
    }
}
