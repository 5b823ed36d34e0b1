//! Markdown to storage format.
//!
//! Markdown (CommonMark with GFM tables and task lists) is read by
//! pulldown-cmark and its events are built into the document model
//! ([`ast_builder`]), which the storage renderer writes out. Raw HTML in the
//! input is treated as text and escaped, and dangerous link targets degrade
//! to their text, so the output always passes the sanitizer unchanged.

pub mod ast_builder;

use pulldown_cmark::{Options, Parser};

use crate::document::{Block, StorageRenderer};

pub use ast_builder::AstBuilder;

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS
}

/// Parse Markdown into the document model.
#[must_use]
pub fn parse_markdown(markdown: &str) -> Vec<Block> {
    AstBuilder::new().build(Parser::new_ext(markdown, parser_options()))
}

/// Convert Markdown to storage format.
#[must_use]
pub fn to_storage(markdown: &str) -> String {
    StorageRenderer::new().render(&parse_markdown(markdown))
}
