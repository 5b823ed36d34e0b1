//! Confluence vendor elements (`ac:` macros, `ri:` resource identifiers).
//!
//! Macro names handled at block level:
//! - `code`, `noformat`: fenced code from the CDATA body
//! - `info`, `note`, `tip`, `warning`, `panel`: blockquote of the rich body,
//!   headed by the `title` parameter in bold when present
//! - anything else: its body content, if any

use crate::document::reader::{BlockCollector, collapse_whitespace};
use crate::document::{Block, EmphasisKind, Inline, ListItem, TreeReader};
use crate::markup::Element;
use crate::sanitizer::{DEFAULT_DANGEROUS_SCHEMES, is_dangerous_url};
use crate::utils::constants::DEFAULT_CODE_LANGUAGE;

const CODE_MACROS: &[&str] = &["code", "noformat"];
const PANEL_MACROS: &[&str] = &["info", "note", "tip", "warning", "panel"];

/// Vendor elements that behave like HTML block elements
const BLOCK_VENDOR_ELEMENTS: &[&str] = &[
    "ac:task-list",
    "ac:layout",
    "ac:layout-section",
    "ac:layout-cell",
    "ac:rich-text-body",
];

/// Whether a vendor element produces block content.
pub(crate) fn is_block_vendor_element(element: &Element) -> bool {
    let name = element.name.as_str();
    if BLOCK_VENDOR_ELEMENTS.contains(&name) {
        return true;
    }
    name == "ac:structured-macro" && (is_code_macro(element) || is_panel_macro(element))
}

/// Read a vendor element found among block content.
pub(crate) fn visit_vendor_element(
    reader: &TreeReader,
    element: &Element,
    depth: usize,
    collector: &mut BlockCollector,
) {
    match element.name.as_str() {
        "ac:structured-macro" => match macro_name(element).as_str() {
            name if CODE_MACROS.contains(&name) => collector.push_block(code_block(element)),
            name if PANEL_MACROS.contains(&name) => {
                let blocks = panel_blocks(reader, element, depth);
                if !blocks.is_empty() {
                    collector.push_block(Block::BlockQuote(blocks));
                }
            }
            name => {
                tracing::debug!("Unhandled macro '{}'; keeping body content", name);
                if let Some(body) = element.child("ac:rich-text-body") {
                    let blocks = reader.read_blocks(&body.children, depth + 1);
                    collector.extend_blocks(blocks);
                } else if let Some(body) = element.child("ac:plain-text-body") {
                    collector.extend_inlines(vec![Inline::Text(collapse_whitespace(
                        &body.text_content(),
                    ))]);
                } else {
                    collector.extend_inlines(read_vendor_inline(reader, element, depth));
                }
            }
        },
        "ac:task-list" => collector.push_block(task_list(reader, element, depth)),
        name if BLOCK_VENDOR_ELEMENTS.contains(&name) => {
            collector.flush();
            reader.visit_nodes(&element.children, depth + 1, collector);
            collector.flush();
        }
        _ => collector.extend_inlines(read_vendor_inline(reader, element, depth)),
    }
}

/// Read a vendor element found inside inline content.
pub(crate) fn read_vendor_inline(reader: &TreeReader, element: &Element, depth: usize) -> Vec<Inline> {
    let options = reader.options();

    match element.name.as_str() {
        "ac:link" => read_link(reader, element, depth),
        "ac:image" => {
            let alt = element
                .attr("ac:alt")
                .or_else(|| element.attr("ac:title"))
                .unwrap_or_default()
                .to_string();
            match resource_reference(element) {
                Some(src) if options.preserve_images => vec![Inline::Image { src, alt }],
                _ => vec![Inline::Text(alt)],
            }
        }
        "ac:emoticon" => element
            .attr("ac:name")
            .map(|name| vec![Inline::Text(format!(":{name}:"))])
            .unwrap_or_default(),
        "ac:structured-macro" => {
            if is_code_macro(element) {
                let code = element
                    .child("ac:plain-text-body")
                    .map(Element::text_content)
                    .unwrap_or_default();
                return vec![Inline::Code(code.replace('\n', " "))];
            }
            if let Some(body) = element.child("ac:rich-text-body") {
                return reader.read_inlines(&body.children, depth + 1);
            }
            parameter(element, "title")
                .map(|title| vec![Inline::Text(title)])
                .unwrap_or_default()
        }
        "ac:parameter" | "ac:task-id" | "ac:task-status" => Vec::new(),
        "ri:page" => text_attr(element, "ri:content-title"),
        "ri:attachment" => text_attr(element, "ri:filename"),
        "ri:url" => text_attr(element, "ri:value"),
        "ri:space" => text_attr(element, "ri:space-key"),
        "ri:user" => Vec::new(),
        _ => reader.read_inlines(&element.children, depth),
    }
}

fn text_attr(element: &Element, name: &str) -> Vec<Inline> {
    element
        .attr(name)
        .map(|value| vec![Inline::Text(value.to_string())])
        .unwrap_or_default()
}

fn macro_name(element: &Element) -> String {
    element
        .attr("ac:name")
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_code_macro(element: &Element) -> bool {
    CODE_MACROS.contains(&macro_name(element).as_str())
}

fn is_panel_macro(element: &Element) -> bool {
    PANEL_MACROS.contains(&macro_name(element).as_str())
}

/// Text of `<ac:parameter ac:name="...">`
fn parameter(element: &Element, name: &str) -> Option<String> {
    element
        .child_elements()
        .find(|child| child.name == "ac:parameter" && child.attr("ac:name") == Some(name))
        .map(|child| child.text_content().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn code_block(element: &Element) -> Block {
    let language = parameter(element, "language")
        .map(|language| language.to_ascii_lowercase())
        .filter(|language| language != DEFAULT_CODE_LANGUAGE);
    let code = element
        .child("ac:plain-text-body")
        .map(Element::text_content)
        .unwrap_or_default()
        .replace("\r\n", "\n");
    Block::CodeBlock { language, code }
}

fn panel_blocks(reader: &TreeReader, element: &Element, depth: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    if let Some(title) = parameter(element, "title") {
        blocks.push(Block::Paragraph(vec![Inline::Emphasis(
            EmphasisKind::Strong,
            vec![Inline::Text(title)],
        )]));
    }
    if let Some(body) = element.child("ac:rich-text-body") {
        blocks.extend(reader.read_blocks(&body.children, depth + 2));
    }
    blocks
}

fn task_list(reader: &TreeReader, element: &Element, depth: usize) -> Block {
    let items = element
        .child_elements()
        .filter(|task| task.name == "ac:task")
        .map(|task| {
            let complete = task
                .child("ac:task-status")
                .is_some_and(|status| status.text_content().trim() == "complete");
            let blocks = task
                .child("ac:task-body")
                .map(|body| reader.read_blocks(&body.children, depth + 3))
                .unwrap_or_default();
            ListItem {
                checked: Some(complete),
                blocks,
            }
        })
        .collect();

    Block::List {
        ordered: false,
        items,
    }
}

/// Target of an `ac:image` / `ac:link`: an `ri:url` value or attachment name
fn resource_reference(element: &Element) -> Option<String> {
    let reference = element
        .child("ri:url")
        .and_then(|url| url.attr("ri:value"))
        .or_else(|| {
            element
                .child("ri:attachment")
                .and_then(|attachment| attachment.attr("ri:filename"))
        })?
        .trim();
    if reference.is_empty() || is_dangerous_url(reference, DEFAULT_DANGEROUS_SCHEMES) {
        return None;
    }
    Some(reference.to_string())
}

/// `ac:link` becomes its body text, or a Markdown link when it targets an
/// `ri:url`.
fn read_link(reader: &TreeReader, element: &Element, depth: usize) -> Vec<Inline> {
    let mut content = if let Some(body) = element.child("ac:link-body") {
        reader.read_inline_content(&body.children, depth + 1)
    } else if let Some(body) = element.child("ac:plain-text-link-body") {
        vec![Inline::Text(body.text_content())]
    } else {
        Vec::new()
    };

    if content.is_empty() {
        content = element
            .child_elements()
            .filter(|child| child.name.starts_with("ri:"))
            .find_map(|resource| {
                let label = match resource.name.as_str() {
                    "ri:page" => resource.attr("ri:content-title"),
                    "ri:attachment" => resource.attr("ri:filename"),
                    "ri:url" => resource.attr("ri:value"),
                    "ri:space" => resource.attr("ri:space-key"),
                    _ => None,
                }?;
                Some(vec![Inline::Text(label.to_string())])
            })
            .or_else(|| {
                element
                    .attr("ac:anchor")
                    .map(|anchor| vec![Inline::Text(anchor.to_string())])
            })
            .unwrap_or_default();
    }

    let url = element
        .child("ri:url")
        .and_then(|url| url.attr("ri:value"))
        .map(str::trim)
        .filter(|url| !url.is_empty() && !is_dangerous_url(url, DEFAULT_DANGEROUS_SCHEMES));

    match url {
        Some(href) if reader.options().preserve_links => vec![Inline::Link {
            href: href.to_string(),
            content,
        }],
        _ => content,
    }
}
