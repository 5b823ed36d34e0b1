//! Markup conversion and sanitization core for Confluence content tools.
//!
//! Content moves between three representations: Confluence storage format
//! (XHTML with `ac:`/`ri:` macro elements), Markdown, and the rendered export
//! HTML. Every conversion is a total function returning best-effort output,
//! and everything headed for storage passes an allow-list sanitizer.
//!
//! ```
//! use kodegen_tools_confluence::{sanitize, to_markdown, to_storage};
//!
//! let storage = to_storage("# Title\n\nSome **bold** text");
//! assert_eq!(storage, "<h1>Title</h1><p>Some <strong>bold</strong> text</p>");
//! assert_eq!(sanitize(&storage), storage);
//! assert_eq!(to_markdown(&storage), "# Title\n\nSome **bold** text");
//! ```

pub mod config;
pub mod document;
pub mod document_assembler;
pub mod export_converter;
pub mod format_detector;
pub mod image_embedder;
pub mod markdown_converter;
pub mod markup;
pub mod pipeline;
pub mod sanitizer;
pub mod storage_converter;
pub mod utils;

pub use config::{ImageEmbedConfig, MarkupConfig, MarkupConfigBuilder};
pub use document_assembler::DocumentMetadata;
pub use export_converter::ConversionOptions;
pub use format_detector::{Format, MarkupDocument, detect};
pub use image_embedder::{
    EmbeddedImage, FetchError, FetchFuture, FetchResponse, ImageEmbedResult, ImageEmbedder,
    ReqwestFetcher, UrlFetcher,
};
pub use markdown_converter::to_storage;
pub use pipeline::MarkupPipeline;
pub use sanitizer::{HtmlSanitizer, PolicyError, SanitizationPolicy, sanitize};
pub use storage_converter::to_markdown;

/// Convert any user content into sanitized storage format.
#[must_use]
pub fn ensure_storage_format(content: &str) -> String {
    pipeline::ensure_storage_with(content, &HtmlSanitizer::default())
}

/// Convert export view HTML to Markdown with default options.
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    export_converter::html_to_markdown(html)
}

/// Inline same-origin images using default fetch settings.
pub async fn process_images<F>(
    html: &str,
    base_url: &str,
    fetcher: &F,
    embed: bool,
) -> ImageEmbedResult
where
    F: UrlFetcher + ?Sized,
{
    image_embedder::embed_images(html, base_url, fetcher, embed).await
}

/// Wrap content into a standalone HTML document.
#[must_use]
pub fn prepare_html_for_export(content: &str, title: &str, base_url: &str, styled: bool) -> String {
    document_assembler::assemble_html(content, title, base_url, styled)
}

/// Prefix Markdown content with front matter and export information.
#[must_use]
pub fn create_markdown_document(content: &str, metadata: &DocumentMetadata) -> String {
    document_assembler::assemble_markdown(content, metadata)
}
