//! Storage-format renderer for the document model.
//!
//! The renderer builds a markup tree using only elements and attributes the
//! default sanitization policy allows, then writes it with the markup
//! serializer. Its output is therefore a fixed point of the sanitizer.

use crate::markup::{Element, Node, serialize};
use crate::sanitizer::{DEFAULT_DANGEROUS_SCHEMES, is_dangerous_url};
use crate::utils::constants::{DEFAULT_CODE_LANGUAGE, MAX_NESTING_DEPTH};

use super::{Block, EmphasisKind, Inline, ListItem, Table, inline_text};

/// Depth at which content is written as plain text instead of elements
const DEPTH_LIMIT: usize = MAX_NESTING_DEPTH - 8;

/// Renders [`Block`] trees as storage-format XHTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageRenderer;

impl StorageRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn render(&self, blocks: &[Block]) -> String {
        serialize(&self.render_nodes(blocks))
    }

    /// Build the storage markup tree without serializing it.
    #[must_use]
    pub fn render_nodes(&self, blocks: &[Block]) -> Vec<Node> {
        blocks
            .iter()
            .flat_map(|block| self.block(block, 0))
            .collect()
    }

    fn block(&self, block: &Block, depth: usize) -> Vec<Node> {
        if depth >= DEPTH_LIMIT {
            return vec![Node::Text(block_text(block))];
        }

        let node = match block {
            Block::Heading { level, content } => element(
                &format!("h{}", (*level).clamp(1, 6)),
                vec![],
                self.inlines(content, depth + 1),
            ),
            Block::Paragraph(content) => element("p", vec![], self.inlines(content, depth + 1)),
            Block::List { items, .. } if is_task_list(items) => self.task_list(items, depth),
            Block::List { ordered, items } => {
                let name = if *ordered { "ol" } else { "ul" };
                let children = items
                    .iter()
                    .map(|item| element("li", vec![], self.list_item(item, depth + 2)))
                    .collect();
                element(name, vec![], children)
            }
            Block::CodeBlock { language, code } => code_macro(language.as_deref(), code),
            Block::BlockQuote(blocks) => element(
                "blockquote",
                vec![],
                blocks
                    .iter()
                    .flat_map(|inner| self.block(inner, depth + 1))
                    .collect(),
            ),
            Block::Table(table) => self.table(table, depth),
            Block::ThematicBreak => element("hr", vec![], vec![]),
        };

        vec![node]
    }

    /// Tight items (a single paragraph) are written without the `<p>` wrapper.
    fn list_item(&self, item: &ListItem, depth: usize) -> Vec<Node> {
        match item.blocks.as_slice() {
            [Block::Paragraph(content)] => self.inlines(content, depth),
            [Block::Paragraph(content), rest @ ..] => {
                let mut nodes = self.inlines(content, depth);
                nodes.extend(rest.iter().flat_map(|block| self.block(block, depth)));
                nodes
            }
            blocks => blocks
                .iter()
                .flat_map(|block| self.block(block, depth))
                .collect(),
        }
    }

    fn task_list(&self, items: &[ListItem], depth: usize) -> Node {
        let tasks = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let status = if item.checked == Some(true) {
                    "complete"
                } else {
                    "incomplete"
                };
                element(
                    "ac:task",
                    vec![],
                    vec![
                        element("ac:task-id", vec![], vec![Node::Text((index + 1).to_string())]),
                        element("ac:task-status", vec![], vec![Node::Text(status.to_string())]),
                        element("ac:task-body", vec![], self.list_item(item, depth + 3)),
                    ],
                )
            })
            .collect();
        element("ac:task-list", vec![], tasks)
    }

    fn table(&self, table: &Table, depth: usize) -> Node {
        let row = |cells: &[Vec<Inline>], cell_name: &str| {
            element(
                "tr",
                vec![],
                cells
                    .iter()
                    .map(|cell| element(cell_name, vec![], self.inlines(cell, depth + 4)))
                    .collect(),
            )
        };

        let mut sections = Vec::new();
        if let Some(header) = &table.header {
            sections.push(element("thead", vec![], vec![row(header.as_slice(), "th")]));
        }
        if !table.rows.is_empty() {
            sections.push(element(
                "tbody",
                vec![],
                table.rows.iter().map(|cells| row(cells.as_slice(), "td")).collect(),
            ));
        }
        element("table", vec![], sections)
    }

    fn inlines(&self, inlines: &[Inline], depth: usize) -> Vec<Node> {
        if depth >= DEPTH_LIMIT {
            return vec![Node::Text(inline_text(inlines))];
        }

        let mut nodes = Vec::with_capacity(inlines.len());
        for inline in inlines {
            match inline {
                Inline::Text(text) => nodes.push(Node::Text(text.clone())),
                Inline::Emphasis(kind, content) => {
                    let name = match kind {
                        EmphasisKind::Strong => "strong",
                        EmphasisKind::Emphasis => "em",
                    };
                    nodes.push(element(name, vec![], self.inlines(content, depth + 1)));
                }
                Inline::Code(code) => {
                    nodes.push(element("code", vec![], vec![Node::Text(code.clone())]));
                }
                Inline::Link { href, content } => {
                    let children = self.inlines(content, depth + 1);
                    if is_dangerous_url(href, DEFAULT_DANGEROUS_SCHEMES) {
                        nodes.extend(children);
                    } else {
                        nodes.push(element("a", vec![("href", href.as_str())], children));
                    }
                }
                Inline::Image { src, alt } => {
                    if is_dangerous_url(src, DEFAULT_DANGEROUS_SCHEMES) {
                        nodes.push(Node::Text(alt.clone()));
                    } else {
                        nodes.push(image_element(src, alt));
                    }
                }
                Inline::LineBreak => nodes.push(element("br", vec![], vec![])),
            }
        }
        nodes
    }
}

fn element(name: &str, attrs: Vec<(&str, &str)>, children: Vec<Node>) -> Node {
    Node::Element(Element {
        name: name.to_string(),
        attrs: attrs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        children,
    })
}

fn is_task_list(items: &[ListItem]) -> bool {
    !items.is_empty() && items.iter().all(|item| item.checked.is_some())
}

/// `<ac:structured-macro ac:name="code">` with a language parameter and a
/// CDATA body
fn code_macro(language: Option<&str>, code: &str) -> Node {
    let language = language
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .unwrap_or(DEFAULT_CODE_LANGUAGE);

    element(
        "ac:structured-macro",
        vec![("ac:name", "code"), ("ac:schema-version", "1")],
        vec![
            element(
                "ac:parameter",
                vec![("ac:name", "language")],
                vec![Node::Text(language.to_string())],
            ),
            element(
                "ac:plain-text-body",
                vec![],
                vec![Node::CData(code.to_string())],
            ),
        ],
    )
}

/// Absolute or path-like sources become `ri:url`; bare file names are
/// page attachments.
fn image_element(src: &str, alt: &str) -> Node {
    let resource = if src.contains('/') || src.contains(':') {
        element("ri:url", vec![("ri:value", src)], vec![])
    } else {
        element("ri:attachment", vec![("ri:filename", src)], vec![])
    };
    let attrs = if alt.is_empty() {
        vec![]
    } else {
        vec![("ac:alt", alt)]
    };
    element("ac:image", attrs, vec![resource])
}

fn block_text(block: &Block) -> String {
    match block {
        Block::Heading { content, .. } | Block::Paragraph(content) => inline_text(content),
        Block::List { items, .. } => items
            .iter()
            .flat_map(|item| item.blocks.iter().map(block_text))
            .collect::<Vec<_>>()
            .join(" "),
        Block::CodeBlock { code, .. } => code.clone(),
        Block::BlockQuote(blocks) => blocks.iter().map(block_text).collect::<Vec<_>>().join(" "),
        Block::Table(table) => table
            .header
            .iter()
            .chain(table.rows.iter())
            .flat_map(|row| row.iter().map(|cell| inline_text(cell)))
            .collect::<Vec<_>>()
            .join(" "),
        Block::ThematicBreak => String::new(),
    }
}
