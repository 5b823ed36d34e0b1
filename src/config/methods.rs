//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use super::builder::MarkupConfigBuilder;
use super::types::ImageEmbedConfig;

impl<State> MarkupConfigBuilder<State> {
    /// Replace all image embedding settings at once
    #[must_use]
    pub fn image_config(mut self, image: ImageEmbedConfig) -> Self {
        self.image = image;
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.image.fetch_timeout_secs = secs;
        self
    }

    /// Set the largest image (in bytes) that will be inlined
    #[must_use]
    pub fn max_image_bytes(mut self, bytes: usize) -> Self {
        self.image.max_image_bytes = bytes;
        self
    }

    /// Cap concurrent image fetches per document
    ///
    /// Must be at least 1; `build` rejects zero.
    #[must_use]
    pub fn max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.image.max_concurrent_fetches = limit;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.image.user_agent = user_agent.into();
        self
    }

    /// Embed the print stylesheet when assembling export HTML (default: true)
    #[must_use]
    pub fn styled_export(mut self, styled: bool) -> Self {
        self.styled_export = styled;
        self
    }

    /// Number ordered list items on storage to Markdown conversion
    ///
    /// Off by default: ordered lists are rendered with `* ` bullets.
    #[must_use]
    pub fn number_ordered_lists(mut self, numbered: bool) -> Self {
        self.number_ordered_lists = numbered;
        self
    }
}
