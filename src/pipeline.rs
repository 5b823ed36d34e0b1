//! Facade over the conversion, sanitization, embedding and export stages.
//!
//! `MarkupPipeline` binds one validated [`MarkupConfig`] and one read-only
//! sanitization policy. All text operations are synchronous and total;
//! only image embedding is async.

use std::sync::Arc;

use crate::config::MarkupConfig;
use crate::document::{Block, Inline, StorageRenderer};
use crate::document_assembler::{DocumentMetadata, assemble_html, assemble_markdown};
use crate::export_converter::{ConversionOptions, html_to_markdown_with};
use crate::format_detector::{Format, detect};
use crate::image_embedder::{ImageEmbedResult, ImageEmbedder, UrlFetcher};
use crate::markdown_converter;
use crate::sanitizer::{HtmlSanitizer, PolicyError, SanitizationPolicy, default_policy};
use crate::storage_converter::StorageConverter;

/// Markup conversion pipeline bound to one site
#[derive(Debug, Clone)]
pub struct MarkupPipeline {
    config: MarkupConfig,
    sanitizer: HtmlSanitizer,
    storage_converter: StorageConverter,
}

impl MarkupPipeline {
    /// Pipeline with the default storage policy
    #[must_use]
    pub fn new(config: MarkupConfig) -> Self {
        Self::from_parts(config, default_policy())
    }

    /// Pipeline with a custom sanitization policy
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] if the policy allows a forbidden tag or
    /// drops one of the storage macro elements.
    pub fn with_policy(
        config: MarkupConfig,
        policy: Arc<SanitizationPolicy>,
    ) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self::from_parts(config, policy))
    }

    fn from_parts(config: MarkupConfig, policy: Arc<SanitizationPolicy>) -> Self {
        let storage_converter =
            StorageConverter::new().with_numbered_lists(config.number_ordered_lists());
        Self {
            config,
            sanitizer: HtmlSanitizer::new(policy),
            storage_converter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MarkupConfig {
        &self.config
    }

    #[must_use]
    pub fn sanitizer(&self) -> &HtmlSanitizer {
        &self.sanitizer
    }

    #[must_use]
    pub fn detect(&self, content: &str) -> Format {
        detect(content)
    }

    #[must_use]
    pub fn to_storage(&self, markdown: &str) -> String {
        markdown_converter::to_storage(markdown)
    }

    #[must_use]
    pub fn to_markdown(&self, storage: &str) -> String {
        self.storage_converter.convert(storage)
    }

    /// Bring arbitrary user content into sanitized storage format.
    ///
    /// Storage input is sanitized; Markdown is converted first; plain text
    /// becomes escaped paragraphs.
    #[must_use]
    pub fn ensure_storage_format(&self, content: &str) -> String {
        ensure_storage_with(content, &self.sanitizer)
    }

    #[must_use]
    pub fn html_to_markdown(&self, html: &str) -> String {
        let options = ConversionOptions {
            number_ordered_lists: self.config.number_ordered_lists(),
            ..ConversionOptions::default()
        };
        html_to_markdown_with(html, &options)
    }

    #[must_use]
    pub fn html_to_markdown_with(&self, html: &str, options: &ConversionOptions) -> String {
        html_to_markdown_with(html, options)
    }

    /// Inline same-origin images of `html` as data URIs.
    pub async fn process_images<F>(&self, html: &str, fetcher: &F, embed: bool) -> ImageEmbedResult
    where
        F: UrlFetcher + ?Sized,
    {
        ImageEmbedder::new(self.config.base_url(), self.config.image().clone())
            .embed(html, fetcher, embed)
            .await
    }

    #[must_use]
    pub fn prepare_html_for_export(&self, content: &str, title: &str, styled: bool) -> String {
        assemble_html(content, title, self.config.base_url(), styled)
    }

    /// Export HTML using the configured `styled_export` setting
    #[must_use]
    pub fn export_html(&self, content: &str, title: &str) -> String {
        self.prepare_html_for_export(content, title, self.config.styled_export())
    }

    #[must_use]
    pub fn create_markdown_document(&self, content: &str, metadata: &DocumentMetadata) -> String {
        assemble_markdown(content, metadata)
    }

    #[must_use]
    pub fn sanitize(&self, html: &str) -> String {
        self.sanitizer.sanitize(html)
    }
}

pub(crate) fn ensure_storage_with(content: &str, sanitizer: &HtmlSanitizer) -> String {
    let storage = match detect(content) {
        Format::StorageFormat => return sanitizer.sanitize(content),
        Format::Markdown => markdown_converter::to_storage(content),
        Format::PlainText => plain_text_to_storage(content),
    };
    sanitizer.sanitize(&storage)
}

/// Paragraphs split on blank lines; single newlines become line breaks.
fn plain_text_to_storage(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let blocks: Vec<Block> = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| {
            let mut inlines = Vec::new();
            for (i, line) in paragraph.lines().enumerate() {
                if i > 0 {
                    inlines.push(Inline::LineBreak);
                }
                inlines.push(Inline::Text(line.trim().to_string()));
            }
            Block::Paragraph(inlines)
        })
        .collect();
    StorageRenderer::new().render(&blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn pipeline() -> Result<MarkupPipeline> {
        let config = MarkupConfig::builder()
            .base_url("https://example.atlassian.net/wiki")
            .build()?;
        Ok(MarkupPipeline::new(config))
    }

    #[test]
    fn test_ensure_storage_from_markdown() -> Result<()> {
        let storage = pipeline()?.ensure_storage_format("# Title\n\nSome **bold** text");
        assert_eq!(storage, "<h1>Title</h1><p>Some <strong>bold</strong> text</p>");
        Ok(())
    }

    #[test]
    fn test_ensure_storage_sanitizes_storage() -> Result<()> {
        let storage = pipeline()?.ensure_storage_format("<p>ok</p><script>alert(1)</script>");
        assert_eq!(storage, "<p>ok</p>");
        Ok(())
    }

    #[test]
    fn test_ensure_storage_from_plain_text() -> Result<()> {
        let storage = pipeline()?.ensure_storage_format("first line\nsecond & last\n\nnext");
        assert_eq!(
            storage,
            "<p>first line<br />second &amp; last</p><p>next</p>"
        );
        Ok(())
    }

    #[test]
    fn test_numbered_lists_follow_config() -> Result<()> {
        let config = MarkupConfig::builder()
            .base_url("https://example.com")
            .number_ordered_lists(true)
            .build()?;
        let pipeline = MarkupPipeline::new(config);
        assert_eq!(pipeline.to_markdown("<ol><li>a</li><li>b</li></ol>"), "1. a\n2. b");
        assert_eq!(pipeline.html_to_markdown("<ol><li>a</li></ol>"), "1. a");
        Ok(())
    }

    #[test]
    fn test_invalid_policy_rejected() -> Result<()> {
        let config = MarkupConfig::builder().base_url("https://example.com").build()?;
        let policy = SanitizationPolicy::confluence_storage().forbid_tag("p");
        assert!(MarkupPipeline::with_policy(config, Arc::new(policy)).is_err());
        Ok(())
    }
}
