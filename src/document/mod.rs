//! Format-neutral document model.
//!
//! Every conversion goes through this tree: parsers build it from one format
//! and independent renderers write it out in another. The variants cover the
//! common subset the formats share; anything else is reduced to text by the
//! readers before it gets here.

pub mod markdown_renderer;
pub mod reader;
pub mod storage_renderer;

pub use markdown_renderer::MarkdownRenderer;
pub use reader::{ReaderOptions, TreeReader};
pub use storage_renderer::StorageRenderer;

/// Block-level node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { ordered: bool, items: Vec<ListItem> },
    CodeBlock { language: Option<String>, code: String },
    BlockQuote(Vec<Block>),
    Table(Table),
    ThematicBreak,
}

/// One list entry. `checked` is set for task list items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListItem {
    pub checked: Option<bool>,
    pub blocks: Vec<Block>,
}

impl ListItem {
    #[must_use]
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            checked: None,
            blocks,
        }
    }
}

/// A single table cell's inline content
pub type TableCell = Vec<Inline>;

/// Simple (non-nested) table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub header: Option<Vec<TableCell>>,
    pub rows: Vec<Vec<TableCell>>,
}

impl Table {
    /// Widest row, header included
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.header
            .iter()
            .chain(self.rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmphasisKind {
    /// `<strong>` / `**`
    Strong,
    /// `<em>` / `*`
    Emphasis,
}

/// Inline node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(EmphasisKind, Vec<Inline>),
    Code(String),
    Link { href: String, content: Vec<Inline> },
    Image { src: String, alt: String },
    LineBreak,
}

/// Tidy an inline run.
///
/// Merges adjacent text, drops empty text and empty emphasis, and folds an
/// emphasis directly nested in the same kind into one.
#[must_use]
pub fn normalize_inlines(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut output: Vec<Inline> = Vec::with_capacity(inlines.len());

    for inline in inlines {
        match inline {
            Inline::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                if let Some(Inline::Text(previous)) = output.last_mut() {
                    previous.push_str(&text);
                } else {
                    output.push(Inline::Text(text));
                }
            }
            Inline::Emphasis(kind, content) => {
                let mut content = normalize_inlines(content);
                if content.len() == 1
                    && matches!(&content[0], Inline::Emphasis(inner, _) if *inner == kind)
                    && let Some(Inline::Emphasis(_, inner)) = content.pop()
                {
                    content = inner;
                }
                if content.is_empty() {
                    continue;
                }
                output.push(Inline::Emphasis(kind, content));
            }
            Inline::Link { href, content } => output.push(Inline::Link {
                href,
                content: normalize_inlines(content),
            }),
            other => output.push(other),
        }
    }

    output
}

/// Trim whitespace at the edges of an inline run (and drop edge line breaks).
#[must_use]
pub fn trim_inlines(mut inlines: Vec<Inline>) -> Vec<Inline> {
    while matches!(inlines.last(), Some(Inline::LineBreak)) {
        inlines.pop();
    }
    while matches!(inlines.first(), Some(Inline::LineBreak)) {
        inlines.remove(0);
    }

    if let Some(Inline::Text(text)) = inlines.first_mut() {
        let trimmed = text.trim_start().to_string();
        *text = trimmed;
    }
    if let Some(Inline::Text(text)) = inlines.last_mut() {
        let trimmed = text.trim_end().to_string();
        *text = trimmed;
    }

    inlines.retain(|inline| !matches!(inline, Inline::Text(text) if text.is_empty()));
    inlines
}

/// Plain text of an inline run (markup removed)
#[must_use]
pub fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(_, content) | Inline::Link { content, .. } => {
                out.push_str(&inline_text(content));
            }
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_merges_text() {
        let inlines = normalize_inlines(vec![
            Inline::Text("a".into()),
            Inline::Text(String::new()),
            Inline::Text("b".into()),
        ]);
        assert_eq!(inlines, vec![Inline::Text("ab".into())]);
    }

    #[test]
    fn test_normalize_folds_same_kind_emphasis() {
        let inlines = normalize_inlines(vec![Inline::Emphasis(
            EmphasisKind::Strong,
            vec![Inline::Emphasis(
                EmphasisKind::Strong,
                vec![Inline::Text("x".into())],
            )],
        )]);
        assert_eq!(
            inlines,
            vec![Inline::Emphasis(
                EmphasisKind::Strong,
                vec![Inline::Text("x".into())]
            )]
        );
    }

    #[test]
    fn test_trim_inlines() {
        let inlines = trim_inlines(vec![
            Inline::Text("  a ".into()),
            Inline::Code("c".into()),
            Inline::Text(" ".into()),
            Inline::LineBreak,
        ]);
        assert_eq!(inlines, vec![Inline::Text("a ".into()), Inline::Code("c".into())]);
    }
}
