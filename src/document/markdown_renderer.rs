//! Markdown renderer for the document model.
//!
//! Blocks are separated by one blank line, list items are tight, and text is
//! escaped so that re-parsing the output with the Markdown converter gives the
//! same document back.

use super::{Block, EmphasisKind, Inline, ListItem, Table};

/// Renders [`Block`] trees as Markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer {
    numbered_lists: bool,
}

impl MarkdownRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render ordered lists as `1.`, `2.`, ... instead of `*` bullets.
    ///
    /// Off by default: ordered lists come out as bullet lists.
    #[must_use]
    pub fn with_numbered_lists(mut self, numbered: bool) -> Self {
        self.numbered_lists = numbered;
        self
    }

    #[must_use]
    pub fn render(&self, blocks: &[Block]) -> String {
        let parts: Vec<String> = blocks
            .iter()
            .map(|block| self.render_block(block))
            .filter(|part| !part.trim().is_empty())
            .collect();
        collapse_blank_lines(&parts.join("\n\n"))
    }

    fn render_block(&self, block: &Block) -> String {
        match block {
            Block::Heading { level, content } => {
                let text = single_line(&render_inlines(content));
                format!("{} {}", "#".repeat(usize::from((*level).clamp(1, 6))), text)
            }
            Block::Paragraph(content) => escape_line_starts(&render_inlines(content)),
            Block::List { ordered, items } => self.render_list(*ordered, items),
            Block::CodeBlock { language, code } => render_code_block(language.as_deref(), code),
            Block::BlockQuote(blocks) => self
                .render(blocks)
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Table(table) => render_table(table),
            Block::ThematicBreak => "---".to_string(),
        }
    }

    fn render_list(&self, ordered: bool, items: &[ListItem]) -> String {
        let mut lines = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let marker = if ordered && self.numbered_lists {
                format!("{}. ", index + 1)
            } else {
                "* ".to_string()
            };
            let indent = " ".repeat(marker.len());
            let task = match item.checked {
                Some(true) => "[x] ",
                Some(false) => "[ ] ",
                None => "",
            };

            let body = item
                .blocks
                .iter()
                .map(|block| self.render_block(block))
                .filter(|part| !part.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");

            let mut body_lines = body.lines();
            let first = body_lines.next().unwrap_or("");
            lines.push(format!("{marker}{task}{first}").trim_end().to_string());
            for line in body_lines {
                if line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{indent}{line}"));
                }
            }
        }

        lines.join("\n")
    }
}

/// Render an inline run as Markdown text.
#[must_use]
pub fn render_inlines(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape_text(text)),
            Inline::Emphasis(kind, content) => {
                let marker = match kind {
                    EmphasisKind::Strong => "**",
                    EmphasisKind::Emphasis => "*",
                };
                out.push_str(&wrap_emphasis(&render_inlines(content), marker));
            }
            Inline::Code(code) => out.push_str(&code_span(code)),
            Inline::Link { href, content } => {
                let text = render_inlines(content);
                let text = if text.trim().is_empty() {
                    escape_text(href)
                } else {
                    text
                };
                // `!` right before `[` would turn the link into an image
                if out.ends_with('!') {
                    out.pop();
                    out.push_str("\\!");
                }
                out.push('[');
                out.push_str(&text);
                out.push_str("](");
                out.push_str(&escape_url(href));
                out.push(')');
            }
            Inline::Image { src, alt } => {
                out.push_str("![");
                out.push_str(&escape_text(alt));
                out.push_str("](");
                out.push_str(&escape_url(src));
                out.push(')');
            }
            Inline::LineBreak => out.push_str("  \n"),
        }
    }
    out
}

/// Put emphasis markers around the non-whitespace core of `inner`.
///
/// `<strong> x </strong>` becomes ` **x** `: markers never touch whitespace.
fn wrap_emphasis(inner: &str, marker: &str) -> String {
    let core = inner.trim();
    if core.is_empty() {
        return inner.to_string();
    }
    let leading = &inner[..inner.len() - inner.trim_start().len()];
    let trailing = &inner[inner.trim_end().len()..];
    format!("{leading}{marker}{core}{marker}{trailing}")
}

/// Escape Markdown metacharacters in literal text.
///
/// `_` between two alphanumerics (`snake_case`) is left alone. `&` and `<`
/// are escaped only where they would start an entity or an autolink.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (index, &ch) in chars.iter().enumerate() {
        match ch {
            '\\' | '*' | '`' | '[' | ']' => {
                out.push('\\');
                out.push(ch);
            }
            '_' => {
                let before = index
                    .checked_sub(1)
                    .and_then(|i| chars.get(i))
                    .is_some_and(|c| c.is_alphanumeric());
                let after = chars.get(index + 1).is_some_and(|c| c.is_alphanumeric());
                if !(before && after) {
                    out.push('\\');
                }
                out.push('_');
            }
            '&' if entity_follows(&chars[index + 1..]) => out.push_str("\\&"),
            '<' if autolink_follows(&chars[index + 1..]) => out.push_str("\\<"),
            _ => out.push(ch),
        }
    }

    out
}

/// `name;` or `#123;` directly after an `&`
fn entity_follows(rest: &[char]) -> bool {
    let body = rest
        .iter()
        .take(32)
        .take_while(|c| c.is_ascii_alphanumeric() || **c == '#')
        .count();
    body > 0 && rest.get(body) == Some(&';')
}

/// `scheme:...>` or `user@host>` directly after a `<`
fn autolink_follows(rest: &[char]) -> bool {
    let body = rest
        .iter()
        .take_while(|c| !c.is_whitespace() && **c != '<' && **c != '>')
        .count();
    rest.get(body) == Some(&'>') && rest[..body].iter().any(|c| matches!(c, ':' | '@'))
}

fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            '\n' | '\r' | '\t' => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Escape characters at the start of paragraph lines that would otherwise
/// start a block construct (heading, quote, list, rule, setext underline).
fn escape_line_starts(paragraph: &str) -> String {
    paragraph
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            let line = if index == 0 { line } else { line.trim_start() };
            escape_block_marker(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_block_marker(line: &str) -> String {
    let Some(first) = line.chars().next() else {
        return String::new();
    };
    let second = line[first.len_utf8()..].chars().next();
    let marker_followed_by_space = second.is_none_or(char::is_whitespace);

    match first {
        '#' | '>' => return format!("\\{line}"),
        '-' | '+' if marker_followed_by_space => return format!("\\{line}"),
        '<' if second.is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?')) => {
            return format!("\\{line}");
        }
        '~' if line.starts_with("~~~") => return format!("\\{line}"),
        '=' | '-' | '~' if line.trim_end().chars().all(|c| c == first) => {
            return format!("\\{line}");
        }
        _ => {}
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if (1..=9).contains(&digits) {
        let rest = &line[digits..];
        if let Some(delimiter) = rest.chars().next()
            && matches!(delimiter, '.' | ')')
            && rest[1..].chars().next().is_none_or(char::is_whitespace)
        {
            return format!("{}\\{}", &line[..digits], rest);
        }
    }

    line.to_string()
}

fn single_line(text: &str) -> String {
    text.replace("  \n", " ").replace('\n', " ")
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn code_span(code: &str) -> String {
    let code = code.replace('\n', " ");
    let fence = "`".repeat(longest_backtick_run(&code) + 1);
    let needs_padding = code.starts_with('`')
        || code.ends_with('`')
        || (code.len() > 1
            && code.starts_with(' ')
            && code.ends_with(' ')
            && !code.trim().is_empty());
    if needs_padding {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn render_code_block(language: Option<&str>, code: &str) -> String {
    let fence = "`".repeat(longest_backtick_run(code).max(2) + 1);
    let language = language
        .map(str::trim)
        .filter(|lang| !lang.is_empty() && *lang != "none")
        .unwrap_or("");
    let code = code.strip_suffix('\n').unwrap_or(code);
    format!("{fence}{language}\n{code}\n{fence}")
}

fn render_table(table: &Table) -> String {
    let columns = table.column_count();
    if columns == 0 {
        return String::new();
    }

    let (header, rows) = match &table.header {
        Some(header) => (header.as_slice(), table.rows.as_slice()),
        None => match table.rows.split_first() {
            Some((first, rest)) => (first.as_slice(), rest),
            None => return String::new(),
        },
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_table_row(header, columns));
    lines.push(format!("| {} |", vec!["---"; columns].join(" | ")));
    for row in rows {
        lines.push(render_table_row(row, columns));
    }
    lines.join("\n")
}

fn render_table_row(cells: &[Vec<Inline>], columns: usize) -> String {
    let rendered: Vec<String> = (0..columns)
        .map(|index| {
            cells
                .get(index)
                .map(|cell| single_line(&render_inlines(cell)).trim().replace('|', "\\|"))
                .unwrap_or_default()
        })
        .collect();
    format!("| {} |", rendered.join(" | "))
}

/// Collapse runs of blank lines outside fenced code to a single blank line
/// and trim blank lines at both ends.
fn collapse_blank_lines(markdown: &str) -> String {
    let mut result: Vec<&str> = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut blank_run = 0;

    for line in markdown.split('\n') {
        let trimmed = line.trim_start();
        if let Some((ch, count)) = detect_fence(trimmed) {
            match fence {
                None => fence = Some((ch, count)),
                Some((open_ch, open_count))
                    if ch == open_ch && count >= open_count && trimmed.trim_end().len() == count =>
                {
                    fence = None;
                }
                Some(_) => {}
            }
        } else if fence.is_none() && line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            result.push("");
            continue;
        }
        blank_run = 0;
        result.push(line);
    }

    while result.first().is_some_and(|line| line.trim().is_empty()) {
        result.remove(0);
    }
    while result.last().is_some_and(|line| line.trim().is_empty()) {
        result.pop();
    }
    result.join("\n")
}

fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let count = trimmed.chars().take_while(|&c| c == ch).count();
    (count >= 3).then_some((ch, count))
}
