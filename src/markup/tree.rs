//! Best-effort element tree built from the tag stream.
//!
//! Balancing rules:
//! - unmatched end tags are ignored
//! - an end tag closes every element opened after its matching start tag
//! - elements still open at end of input are closed there
//! - void elements and self-closing tags never take children
//! - start tags nested deeper than [`MAX_NESTING_DEPTH`] are dropped and
//!   their content flattened into the deepest kept element

use html_escape::decode_html_entities;

use super::tokenizer::{RawAttribute, Token, tokenize};
use crate::utils::constants::MAX_NESTING_DEPTH;

/// HTML void elements (never have content)
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// A node of the markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Decoded character data
    Text(String),
    /// Literal CDATA section content
    CData(String),
}

/// An element with lowercased name, decoded attribute values and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Look up an attribute value by (lowercase) name
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over direct child elements
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First direct child element with the given name
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|element| element.name == name)
    }

    /// Concatenated text and CDATA content of all descendants
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) | Node::CData(text) => out.push_str(text),
            Node::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// Parse a markup fragment into a list of top-level nodes.
///
/// Never fails: garbage input degrades to text nodes.
#[must_use]
pub fn parse_fragment(input: &str) -> Vec<Node> {
    let mut builder = TreeBuilder::new();

    for token in tokenize(input) {
        match token {
            Token::Text(text) => builder.append_text(&decode_html_entities(text)),
            Token::CData(text) => builder.append(Node::CData(text.to_string())),
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => builder.open(element_from(name, &attrs), self_closing),
            Token::EndTag { name } => builder.close(&name),
            Token::RawText { name, attrs, text } => {
                let mut element = element_from(name, &attrs);
                if !text.is_empty() {
                    element.children.push(Node::Text(text.to_string()));
                }
                builder.append(Node::Element(element));
            }
            Token::Ignored => {}
        }
    }

    builder.finish()
}

fn element_from(name: String, attrs: &[RawAttribute<'_>]) -> Element {
    Element {
        name,
        attrs: attrs
            .iter()
            .map(|attr| (attr.name.clone(), decode_html_entities(attr.value).into_owned()))
            .collect(),
        children: Vec::new(),
    }
}

struct TreeBuilder {
    /// Open elements; index 0 is a synthetic root
    stack: Vec<Element>,
    flattened: usize,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Element::new("#root")],
            flattened: 0,
        }
    }

    fn current(&mut self) -> &mut Element {
        // The root is never popped, so the stack is never empty.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn append(&mut self, node: Node) {
        self.current().children.push(node);
    }

    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let current = self.current();
        if let Some(Node::Text(previous)) = current.children.last_mut() {
            previous.push_str(text);
        } else {
            current.children.push(Node::Text(text.to_string()));
        }
    }

    fn open(&mut self, element: Element, self_closing: bool) {
        if self_closing || element.is_void() {
            self.append(Node::Element(element));
            return;
        }
        if self.stack.len() > MAX_NESTING_DEPTH {
            self.flattened += 1;
            return;
        }
        self.stack.push(element);
    }

    fn close(&mut self, name: &str) {
        let Some(index) = self.stack.iter().rposition(|open| open.name == name) else {
            return;
        };
        if index == 0 {
            return;
        }
        while self.stack.len() > index {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some(element) = self.stack.pop() {
            self.append(Node::Element(element));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while self.stack.len() > 1 {
            self.pop();
        }
        if self.flattened > 0 {
            tracing::debug!(
                "Markup nesting exceeded {} levels; flattened {} start tags",
                MAX_NESTING_DEPTH,
                self.flattened
            );
        }
        let root = self.stack.pop().unwrap_or_default();
        root.children
    }
}
