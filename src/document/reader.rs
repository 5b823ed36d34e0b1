//! Markup tree to document model.
//!
//! Reads the HTML subset shared by storage format and export HTML. Vendor
//! (`ac:`/`ri:`) elements are handed to [`crate::storage_converter::macros`].
//! Unknown elements are transparent: their content is read in place.
//!
//! HTML whitespace rules apply to text outside `<pre>`: runs of whitespace
//! collapse to one space and non-breaking spaces become plain spaces.

use std::sync::LazyLock;

use regex::Regex;

use crate::markup::{Element, Node};
use crate::sanitizer::{DEFAULT_DANGEROUS_SCHEMES, is_dangerous_url};
use crate::storage_converter::macros;
use crate::utils::constants::MAX_NESTING_DEPTH;

use super::{Block, EmphasisKind, Inline, ListItem, Table, normalize_inlines, trim_inlines};

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE: hardcoded regex is valid"));

static BRUSH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)brush:\s*([A-Za-z0-9_+#.-]+)").expect("BRUSH_RE: hardcoded regex is valid")
});

/// Elements dropped together with their content
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "head", "title", "noscript", "template", "meta", "link", "iframe",
    "object", "embed", "svg", "math", "button", "select", "textarea",
];

/// Elements that start a new block when they appear between inline content
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "pre", "blockquote", "table",
    "hr", "div", "section", "article", "main", "header", "footer", "nav", "aside", "figure",
    "body", "html", "dl", "dt", "dd", "center", "details", "summary", "address", "fieldset",
];

/// Which constructs survive conversion; the rest are reduced to their text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub preserve_tables: bool,
    pub preserve_links: bool,
    pub preserve_images: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            preserve_tables: true,
            preserve_links: true,
            preserve_images: true,
        }
    }
}

/// Accumulates blocks, buffering inline content until a block boundary.
#[derive(Debug, Default)]
pub(crate) struct BlockCollector {
    blocks: Vec<Block>,
    pending: Vec<Inline>,
}

impl BlockCollector {
    pub(crate) fn push_inline(&mut self, inline: Inline) {
        self.pending.push(inline);
    }

    pub(crate) fn extend_inlines(&mut self, inlines: Vec<Inline>) {
        self.pending.extend(inlines);
    }

    /// Close the current paragraph, if it has any content.
    pub(crate) fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let content = trim_inlines(normalize_inlines(std::mem::take(&mut self.pending)));
        if !content.is_empty() {
            self.blocks.push(Block::Paragraph(content));
        }
    }

    pub(crate) fn push_block(&mut self, block: Block) {
        self.flush();
        self.blocks.push(block);
    }

    pub(crate) fn extend_blocks(&mut self, blocks: Vec<Block>) {
        self.flush();
        self.blocks.extend(blocks);
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Converts markup trees into [`Block`] lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeReader {
    options: ReaderOptions,
}

impl TreeReader {
    #[must_use]
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    /// Read a top-level node list.
    #[must_use]
    pub fn read(&self, nodes: &[Node]) -> Vec<Block> {
        self.read_blocks(nodes, 0)
    }

    pub(crate) fn read_blocks(&self, nodes: &[Node], depth: usize) -> Vec<Block> {
        let mut collector = BlockCollector::default();
        self.visit_nodes(nodes, depth, &mut collector);
        collector.finish()
    }

    pub(crate) fn visit_nodes(&self, nodes: &[Node], depth: usize, collector: &mut BlockCollector) {
        for node in nodes {
            match node {
                Node::Text(text) | Node::CData(text) => {
                    collector.push_inline(Inline::Text(collapse_whitespace(text)));
                }
                Node::Element(element) => self.visit_element(element, depth, collector),
            }
        }
    }

    fn visit_element(&self, element: &Element, depth: usize, collector: &mut BlockCollector) {
        let name = element.name.as_str();
        if DROPPED_ELEMENTS.contains(&name) {
            return;
        }
        if depth >= MAX_NESTING_DEPTH {
            tracing::debug!("Nesting limit reached at <{}>; keeping text only", name);
            collector.push_inline(Inline::Text(collapse_whitespace(&element.text_content())));
            return;
        }
        if is_vendor_element(name) {
            macros::visit_vendor_element(self, element, depth, collector);
            return;
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<u8>().unwrap_or(1);
                let content = self.read_inline_content(&element.children, depth + 1);
                collector.flush();
                if !content.is_empty() {
                    collector.push_block(Block::Heading { level, content });
                }
            }
            "ul" | "ol" => {
                let list = self.read_list(element, name == "ol", depth);
                collector.push_block(list);
            }
            "pre" => collector.push_block(Block::CodeBlock {
                language: code_language(element),
                code: pre_text(element),
            }),
            "blockquote" => {
                let blocks = self.read_blocks(&element.children, depth + 1);
                collector.flush();
                if !blocks.is_empty() {
                    collector.push_block(Block::BlockQuote(blocks));
                }
            }
            "table" => {
                if self.options.preserve_tables {
                    collector.push_block(Block::Table(self.read_table(element, depth)));
                } else {
                    let blocks = self.table_as_paragraphs(element, depth);
                    collector.extend_blocks(blocks);
                }
            }
            "hr" => collector.push_block(Block::ThematicBreak),
            "br" => collector.push_inline(Inline::LineBreak),
            _ if BLOCK_ELEMENTS.contains(&name) || self.contains_block(element, depth) => {
                collector.flush();
                self.visit_nodes(&element.children, depth + 1, collector);
                collector.flush();
            }
            _ => collector.extend_inlines(self.read_inline_element(element, depth)),
        }
    }

    /// Inline content, normalized and trimmed
    pub(crate) fn read_inline_content(&self, nodes: &[Node], depth: usize) -> Vec<Inline> {
        trim_inlines(normalize_inlines(self.read_inlines(nodes, depth)))
    }

    pub(crate) fn read_inlines(&self, nodes: &[Node], depth: usize) -> Vec<Inline> {
        let mut inlines = Vec::new();
        for node in nodes {
            match node {
                Node::Text(text) | Node::CData(text) => {
                    inlines.push(Inline::Text(collapse_whitespace(text)));
                }
                Node::Element(element) => {
                    inlines.extend(self.read_inline_element(element, depth + 1));
                }
            }
        }
        inlines
    }

    pub(crate) fn read_inline_element(&self, element: &Element, depth: usize) -> Vec<Inline> {
        let name = element.name.as_str();
        if DROPPED_ELEMENTS.contains(&name) {
            return Vec::new();
        }
        if depth >= MAX_NESTING_DEPTH {
            return vec![Inline::Text(collapse_whitespace(&element.text_content()))];
        }
        if is_vendor_element(name) {
            return macros::read_vendor_inline(self, element, depth);
        }

        match name {
            "strong" | "b" => vec![Inline::Emphasis(
                EmphasisKind::Strong,
                self.read_inlines(&element.children, depth),
            )],
            "em" | "i" => vec![Inline::Emphasis(
                EmphasisKind::Emphasis,
                self.read_inlines(&element.children, depth),
            )],
            "code" | "kbd" | "samp" | "tt" => {
                vec![Inline::Code(element.text_content().replace('\n', " "))]
            }
            "a" => {
                let content = self.read_inlines(&element.children, depth);
                match element.attr("href").map(str::trim) {
                    Some(href)
                        if self.options.preserve_links
                            && !href.is_empty()
                            && !is_dangerous_url(href, DEFAULT_DANGEROUS_SCHEMES) =>
                    {
                        vec![Inline::Link {
                            href: href.to_string(),
                            content,
                        }]
                    }
                    _ => content,
                }
            }
            "img" => {
                let alt = element.attr("alt").unwrap_or_default().trim().to_string();
                match element.attr("src").map(str::trim) {
                    Some(src)
                        if self.options.preserve_images
                            && !src.is_empty()
                            && !is_dangerous_url(src, DEFAULT_DANGEROUS_SCHEMES) =>
                    {
                        vec![Inline::Image {
                            src: src.to_string(),
                            alt,
                        }]
                    }
                    _ => vec![Inline::Text(alt)],
                }
            }
            "br" => vec![Inline::LineBreak],
            _ if BLOCK_ELEMENTS.contains(&name) => {
                let mut inlines = vec![Inline::Text(" ".to_string())];
                inlines.extend(self.read_inlines(&element.children, depth));
                inlines.push(Inline::Text(" ".to_string()));
                inlines
            }
            _ => self.read_inlines(&element.children, depth),
        }
    }

    fn read_list(&self, element: &Element, ordered: bool, depth: usize) -> Block {
        let mut items: Vec<ListItem> = Vec::new();

        for child in &element.children {
            match child {
                Node::Element(item) if item.name == "li" => {
                    items.push(ListItem::new(self.read_blocks(&item.children, depth + 2)));
                }
                Node::Element(nested) if nested.name == "ul" || nested.name == "ol" => {
                    let block = self.read_list(nested, nested.name == "ol", depth + 1);
                    match items.last_mut() {
                        Some(previous) => previous.blocks.push(block),
                        None => items.push(ListItem::new(vec![block])),
                    }
                }
                Node::Text(text) if text.trim().is_empty() => {}
                other => {
                    let blocks = self.read_blocks(std::slice::from_ref(other), depth + 1);
                    if !blocks.is_empty() {
                        items.push(ListItem::new(blocks));
                    }
                }
            }
        }

        Block::List { ordered, items }
    }

    fn read_table(&self, element: &Element, depth: usize) -> Table {
        let mut header_rows: Vec<Vec<Vec<Inline>>> = Vec::new();
        let mut rows: Vec<(Vec<Vec<Inline>>, bool)> = Vec::new();

        for (row, in_head) in table_rows(element) {
            let mut all_th = true;
            let cells: Vec<Vec<Inline>> = row
                .child_elements()
                .filter(|cell| cell.name == "td" || cell.name == "th")
                .map(|cell| {
                    all_th &= cell.name == "th";
                    self.read_inline_content(&cell.children, depth + 3)
                })
                .collect();
            if cells.is_empty() {
                continue;
            }
            if in_head {
                header_rows.push(cells);
            } else {
                rows.push((cells, all_th));
            }
        }

        let mut header = header_rows.into_iter().next();
        if header.is_none() && rows.first().is_some_and(|(_, all_th)| *all_th) {
            header = Some(rows.remove(0).0);
        }

        Table {
            header,
            rows: rows.into_iter().map(|(cells, _)| cells).collect(),
        }
    }

    fn table_as_paragraphs(&self, element: &Element, depth: usize) -> Vec<Block> {
        table_rows(element)
            .into_iter()
            .filter_map(|(row, _)| {
                let mut inlines = Vec::new();
                for cell in row.child_elements() {
                    if !inlines.is_empty() {
                        inlines.push(Inline::Text(" ".to_string()));
                    }
                    inlines.extend(self.read_inlines(&cell.children, depth + 3));
                }
                let content = trim_inlines(normalize_inlines(inlines));
                (!content.is_empty()).then_some(Block::Paragraph(content))
            })
            .collect()
    }

    /// Whether any descendant is a block element (so the element cannot be
    /// read as inline content)
    fn contains_block(&self, element: &Element, depth: usize) -> bool {
        if depth >= MAX_NESTING_DEPTH {
            return false;
        }
        element.child_elements().any(|child| {
            BLOCK_ELEMENTS.contains(&child.name.as_str())
                || macros::is_block_vendor_element(child)
                || self.contains_block(child, depth + 1)
        })
    }
}

fn is_vendor_element(name: &str) -> bool {
    name.starts_with("ac:") || name.starts_with("ri:")
}

/// `tr` elements of a table with a flag for rows inside `thead`.
/// Nested tables are not descended into.
fn table_rows(table: &Element) -> Vec<(&Element, bool)> {
    let mut rows = Vec::new();
    for child in table.child_elements() {
        match child.name.as_str() {
            "tr" => rows.push((child, false)),
            "thead" | "tbody" | "tfoot" => {
                let in_head = child.name == "thead";
                rows.extend(
                    child
                        .child_elements()
                        .filter(|row| row.name == "tr")
                        .map(|row| (row, in_head)),
                );
            }
            _ => {}
        }
    }
    rows
}

/// Collapse HTML whitespace runs to a single space
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let text = text.replace('\u{a0}', " ");
    WHITESPACE_RE.replace_all(&text, " ").into_owned()
}

fn pre_text(element: &Element) -> String {
    let text = element.text_content().replace("\r\n", "\n");
    let text = text.strip_prefix('\n').unwrap_or(&text);
    text.strip_suffix('\n').unwrap_or(text).to_string()
}

/// Language of a `<pre>` block from the Confluence syntax highlighter
/// parameters or a `language-*` class.
fn code_language(pre: &Element) -> Option<String> {
    if let Some(params) = pre.attr("data-syntaxhighlighter-params")
        && let Some(caps) = BRUSH_RE.captures(params)
    {
        return caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
    }

    std::iter::once(pre)
        .chain(pre.child("code"))
        .filter_map(|element| element.attr("class"))
        .flat_map(str::split_whitespace)
        .find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .map(str::to_string)
        })
        .filter(|language| !language.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_fragment;

    fn read(input: &str) -> Vec<Block> {
        TreeReader::default().read(&parse_fragment(input))
    }

    fn text(value: &str) -> Inline {
        Inline::Text(value.to_string())
    }

    #[test]
    fn test_whitespace_collapses() {
        let blocks = read("<p>  Hello \n\t world&nbsp;!  </p>");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("Hello world !")])]);
    }

    #[test]
    fn test_inline_runs_become_paragraphs() {
        let blocks = read("loose <b>text</b><h2>Head</h2>tail");
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[1],
            Block::Heading {
                level: 2,
                content: vec![text("Head")]
            }
        );
    }

    #[test]
    fn test_div_with_blocks_is_transparent() {
        let blocks = read("<div><span><p>a</p></span><p>b</p></div>");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(vec![text("a")]),
                Block::Paragraph(vec![text("b")])
            ]
        );
    }

    #[test]
    fn test_nested_list_inside_item() {
        let blocks = read("<ul><li>a<ul><li>b</li></ul></li></ul>");
        let Block::List { items, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items[0].blocks.len(), 2);
        assert!(matches!(items[0].blocks[1], Block::List { .. }));
    }

    #[test]
    fn test_table_header_from_th_row() {
        let blocks = read("<table><tr><th>A</th></tr><tr><td>1</td></tr></table>");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.header, Some(vec![vec![text("A")]]));
        assert_eq!(table.rows, vec![vec![vec![text("1")]]]);
    }

    #[test]
    fn test_dangerous_link_is_dropped() {
        let blocks = read(r#"<p><a href="javascript:alert(1)">x</a></p>"#);
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("x")])]);
    }

    #[test]
    fn test_pre_language_from_brush() {
        let blocks =
            read(r#"<pre data-syntaxhighlighter-params="brush: java; gutter: false">int x;</pre>"#);
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: Some("java".to_string()),
                code: "int x;".to_string()
            }]
        );
    }

    #[test]
    fn test_options_reduce_to_text() {
        let reader = TreeReader::new(ReaderOptions {
            preserve_tables: false,
            preserve_links: false,
            preserve_images: false,
        });
        let blocks = reader.read(&parse_fragment(
            r#"<p><a href="/x">link</a> <img src="/a.png" alt="pic"></p><table><tr><td>1</td><td>2</td></tr></table>"#,
        ));
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(vec![text("link pic")]),
                Block::Paragraph(vec![text("1 2")])
            ]
        );
    }
}
