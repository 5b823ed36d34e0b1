//! Type-safe builder for `MarkupConfig` using the typestate pattern
//!
//! The base URL is required before `build` becomes available; everything
//! else has a default.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;

use super::types::{ImageEmbedConfig, MarkupConfig};
use crate::utils::is_valid_base_url;

// Type states for the builder
pub struct WithBaseUrl;

pub struct MarkupConfigBuilder<State = ()> {
    pub(crate) base_url: Option<String>,
    pub(crate) image: ImageEmbedConfig,
    pub(crate) styled_export: bool,
    pub(crate) number_ordered_lists: bool,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for MarkupConfigBuilder<()> {
    fn default() -> Self {
        Self {
            base_url: None,
            image: ImageEmbedConfig::default(),
            styled_export: true,
            number_ordered_lists: false,
            _phantom: PhantomData,
        }
    }
}

impl MarkupConfig {
    /// Create a builder for configuring a `MarkupConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> MarkupConfigBuilder<()> {
        MarkupConfigBuilder::default()
    }
}

impl MarkupConfigBuilder<()> {
    pub fn base_url(self, url: impl Into<String>) -> MarkupConfigBuilder<WithBaseUrl> {
        let url = url.into();
        let trimmed = url.trim().trim_end_matches('/').to_string();

        MarkupConfigBuilder {
            base_url: Some(trimmed),
            image: self.image,
            styled_export: self.styled_export,
            number_ordered_lists: self.number_ordered_lists,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl MarkupConfigBuilder<WithBaseUrl> {
    pub fn build(self) -> Result<MarkupConfig> {
        let base_url = self
            .base_url
            .ok_or_else(|| anyhow!("base_url is required"))?;

        if !is_valid_base_url(&base_url) {
            return Err(anyhow!(
                "base_url must be an absolute http(s) URL, got '{base_url}'"
            ));
        }
        if self.image.max_concurrent_fetches == 0 {
            return Err(anyhow!("max_concurrent_fetches must be at least 1"));
        }
        if self.image.max_image_bytes == 0 {
            return Err(anyhow!("max_image_bytes must be greater than zero"));
        }

        Ok(MarkupConfig {
            base_url,
            image: self.image,
            styled_export: self.styled_export,
            number_ordered_lists: self.number_ordered_lists,
        })
    }
}
