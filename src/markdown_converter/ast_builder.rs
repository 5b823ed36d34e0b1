//! Builds the document model from pulldown-cmark events.
//!
//! Open constructs live on a frame stack. Block containers nested deeper
//! than [`MAX_BLOCK_NESTING`] and inline spans nested deeper than
//! [`MAX_INLINE_NESTING`] are not opened; their content flows into the
//! enclosing frame. Raw HTML is kept as literal text.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, LinkType, Tag};

use crate::document::{
    Block, EmphasisKind, Inline, ListItem, Table, TableCell, inline_text, normalize_inlines,
    trim_inlines,
};
use crate::sanitizer::{DEFAULT_DANGEROUS_SCHEMES, is_dangerous_url};
use crate::utils::constants::{MAX_BLOCK_NESTING, MAX_INLINE_NESTING};

enum Frame {
    /// Document root or block quote. `pending` holds inlines that arrived
    /// outside any paragraph (flattened list items).
    Container {
        blocks: Vec<Block>,
        pending: Vec<Inline>,
    },
    List {
        ordered: bool,
        items: Vec<ListItem>,
    },
    /// Tight items receive their text directly, without a paragraph
    Item {
        checked: Option<bool>,
        blocks: Vec<Block>,
        pending: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    Table(Table),
    Row {
        head: bool,
        cells: Vec<TableCell>,
    },
    Cell(Vec<Inline>),
    Emphasis(EmphasisKind, Vec<Inline>),
    Link {
        href: String,
        content: Vec<Inline>,
    },
    Image {
        src: String,
        content: Vec<Inline>,
    },
    /// Consecutive constructs that were not opened, one flag per construct:
    /// whether closing it ends a paragraph of pending text
    Passthrough(Vec<bool>),
}

/// Consumes a Markdown event stream and produces blocks.
pub struct AstBuilder {
    stack: Vec<Frame>,
    block_depth: usize,
    inline_depth: usize,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![Frame::Container {
                blocks: Vec::new(),
                pending: Vec::new(),
            }],
            block_depth: 0,
            inline_depth: 0,
        }
    }

    /// Consume every event and return the finished blocks.
    pub fn build<'a, I>(mut self, events: I) -> Vec<Block>
    where
        I: Iterator<Item = Event<'a>>,
    {
        for event in events {
            self.process_event(event);
        }
        self.finish()
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(_) => self.end_tag(),
            Event::Text(text) => self.push_inline(Inline::Text(text.into_string())),
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_inline(Inline::Text(html.into_string()));
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.push_inline(Inline::Text(math.into_string()));
            }
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::Text(format!("[^{label}]")));
            }
            Event::SoftBreak => self.push_inline(Inline::Text("\n".to_string())),
            Event::HardBreak => self.push_inline(Inline::LineBreak),
            Event::Rule => self.push_block(Block::ThematicBreak),
            Event::TaskListMarker(done) => self.mark_task(done),
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph | Tag::HtmlBlock => Frame::Paragraph(Vec::new()),
            Tag::Heading { level, .. } => Frame::Heading {
                level: heading_level(level),
                content: Vec::new(),
            },
            Tag::BlockQuote(_) if self.block_depth < MAX_BLOCK_NESTING => Frame::Container {
                blocks: Vec::new(),
                pending: Vec::new(),
            },
            Tag::List(start) if self.block_depth < MAX_BLOCK_NESTING => Frame::List {
                ordered: start.is_some(),
                items: Vec::new(),
            },
            Tag::Item if matches!(self.stack.last(), Some(Frame::List { .. })) => Frame::Item {
                checked: None,
                blocks: Vec::new(),
                pending: Vec::new(),
            },
            Tag::Item => {
                self.flush_pending();
                return self.open_passthrough(true);
            }
            Tag::CodeBlock(kind) => Frame::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                },
                code: String::new(),
            },
            Tag::Table(_) => Frame::Table(Table::default()),
            Tag::TableHead => Frame::Row {
                head: true,
                cells: Vec::new(),
            },
            Tag::TableRow => Frame::Row {
                head: false,
                cells: Vec::new(),
            },
            Tag::TableCell => Frame::Cell(Vec::new()),
            Tag::Emphasis if self.inline_depth < MAX_INLINE_NESTING => {
                Frame::Emphasis(EmphasisKind::Emphasis, Vec::new())
            }
            Tag::Strong if self.inline_depth < MAX_INLINE_NESTING => {
                Frame::Emphasis(EmphasisKind::Strong, Vec::new())
            }
            Tag::Link {
                link_type,
                dest_url,
                ..
            } if self.inline_depth < MAX_INLINE_NESTING => Frame::Link {
                href: match link_type {
                    LinkType::Email => format!("mailto:{dest_url}"),
                    _ => dest_url.into_string(),
                },
                content: Vec::new(),
            },
            Tag::Image { dest_url, .. } if self.inline_depth < MAX_INLINE_NESTING => Frame::Image {
                src: dest_url.into_string(),
                content: Vec::new(),
            },
            _ => return self.open_passthrough(false),
        };
        self.push(frame);
    }

    fn end_tag(&mut self) {
        if let Some(Frame::Passthrough(flags)) = self.stack.last_mut() {
            let flush = flags.pop().unwrap_or(false);
            if flags.is_empty() {
                self.stack.pop();
            }
            if flush {
                self.flush_pending();
            }
            return;
        }

        let Some(frame) = self.pop() else {
            return;
        };
        match frame {
            Frame::Container {
                mut blocks,
                mut pending,
                ..
            } => {
                flush_into(&mut blocks, &mut pending);
                if !blocks.is_empty() {
                    self.push_block(Block::BlockQuote(blocks));
                }
            }
            Frame::List { ordered, items } => {
                if !items.is_empty() {
                    self.push_block(Block::List { ordered, items });
                }
            }
            Frame::Item {
                checked,
                mut blocks,
                mut pending,
            } => {
                flush_into(&mut blocks, &mut pending);
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(ListItem { checked, blocks });
                }
            }
            Frame::Paragraph(content) => {
                let content = tidy(content);
                if !content.is_empty() {
                    self.push_block(Block::Paragraph(content));
                }
            }
            Frame::Heading { level, content } => {
                let content = tidy(content);
                if !content.is_empty() {
                    self.push_block(Block::Heading { level, content });
                }
            }
            Frame::CodeBlock { language, mut code } => {
                if code.ends_with('\n') {
                    code.pop();
                }
                self.push_block(Block::CodeBlock { language, code });
            }
            Frame::Table(table) => self.push_block(Block::Table(table)),
            Frame::Row { head, cells } => {
                if let Some(Frame::Table(table)) = self.stack.last_mut() {
                    if head {
                        table.header = Some(cells);
                    } else {
                        table.rows.push(cells);
                    }
                }
            }
            Frame::Cell(content) => {
                if let Some(Frame::Row { cells, .. }) = self.stack.last_mut() {
                    cells.push(tidy(content));
                }
            }
            Frame::Emphasis(kind, content) => self.push_inline(Inline::Emphasis(kind, content)),
            Frame::Link { href, content } => {
                if is_safe_target(&href) {
                    self.push_inline(Inline::Link { href, content });
                } else {
                    for inline in content {
                        self.push_inline(inline);
                    }
                }
            }
            Frame::Image { src, content } => {
                let alt = inline_text(&content);
                if is_safe_target(&src) {
                    self.push_inline(Inline::Image { src, alt });
                } else {
                    self.push_inline(Inline::Text(alt));
                }
            }
            Frame::Passthrough(_) => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        while self.stack.len() > 1 {
            self.end_tag();
        }
        match self.stack.pop() {
            Some(Frame::Container {
                mut blocks,
                mut pending,
                ..
            }) => {
                flush_into(&mut blocks, &mut pending);
                blocks
            }
            _ => Vec::new(),
        }
    }

    fn push(&mut self, frame: Frame) {
        match frame {
            Frame::Container { .. } | Frame::List { .. } => self.block_depth += 1,
            Frame::Emphasis(..) | Frame::Link { .. } | Frame::Image { .. } => {
                self.inline_depth += 1;
            }
            _ => {}
        }
        self.stack.push(frame);
    }

    /// Pop the innermost frame; the root is never popped.
    fn pop(&mut self) -> Option<Frame> {
        if self.stack.len() <= 1 {
            return None;
        }
        let frame = self.stack.pop()?;
        match frame {
            Frame::Container { .. } | Frame::List { .. } => {
                self.block_depth = self.block_depth.saturating_sub(1);
            }
            Frame::Emphasis(..) | Frame::Link { .. } | Frame::Image { .. } => {
                self.inline_depth = self.inline_depth.saturating_sub(1);
            }
            _ => {}
        }
        Some(frame)
    }

    fn open_passthrough(&mut self, flush: bool) {
        if let Some(Frame::Passthrough(flags)) = self.stack.last_mut() {
            flags.push(flush);
        } else {
            self.stack.push(Frame::Passthrough(vec![flush]));
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Paragraph(content)
                | Frame::Heading { content, .. }
                | Frame::Cell(content)
                | Frame::Emphasis(_, content)
                | Frame::Link { content, .. }
                | Frame::Image { content, .. } => {
                    content.push(inline);
                    return;
                }
                Frame::Container { pending, .. } | Frame::Item { pending, .. } => {
                    pending.push(inline);
                    return;
                }
                Frame::CodeBlock { code, .. } => {
                    code.push_str(&inline_text(std::slice::from_ref(&inline)));
                    return;
                }
                Frame::List { .. } | Frame::Table(_) | Frame::Row { .. } | Frame::Passthrough(_) => {}
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Container {
                blocks, pending, ..
            }
            | Frame::Item {
                blocks, pending, ..
            } = frame
            {
                flush_into(blocks, pending);
                blocks.push(block);
                return;
            }
        }
    }

    /// Close the paragraph of pending text in the innermost container
    fn flush_pending(&mut self) {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Container {
                blocks, pending, ..
            }
            | Frame::Item {
                blocks, pending, ..
            } = frame
            {
                flush_into(blocks, pending);
                return;
            }
        }
    }

    fn mark_task(&mut self, done: bool) {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Item { checked, .. } = frame {
                *checked = Some(done);
                return;
            }
        }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn tidy(content: Vec<Inline>) -> Vec<Inline> {
    trim_inlines(normalize_inlines(content))
}

fn flush_into(blocks: &mut Vec<Block>, pending: &mut Vec<Inline>) {
    if pending.is_empty() {
        return;
    }
    let content = tidy(std::mem::take(pending));
    if !content.is_empty() {
        blocks.push(Block::Paragraph(content));
    }
}

fn is_safe_target(url: &str) -> bool {
    !url.trim().is_empty() && !is_dangerous_url(url, DEFAULT_DANGEROUS_SCHEMES)
}
