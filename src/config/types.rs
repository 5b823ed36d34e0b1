//! Core configuration types for the markup pipeline
//!
//! This module contains the `MarkupConfig` struct and the image embedding
//! settings it carries.

use serde::{Deserialize, Serialize};

use crate::utils::constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_MAX_IMAGE_BYTES,
    DEFAULT_USER_AGENT,
};

/// Settings for inlining images as data URIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageEmbedConfig {
    /// Timeout for a single image fetch, in seconds
    pub fetch_timeout_secs: u64,

    /// Maximum size of an inlined image (bytes)
    ///
    /// Larger images keep their original reference and record a failure.
    pub max_image_bytes: usize,

    /// Upper bound on concurrent fetches for one document
    pub max_concurrent_fetches: usize,

    /// User agent sent by the default HTTP fetcher
    pub user_agent: String,
}

impl Default for ImageEmbedConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ImageEmbedConfig {
    #[must_use]
    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Main configuration struct for markup conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupConfig {
    /// Site root used to resolve relative references.
    ///
    /// **INVARIANT:** Always an absolute http(s) URL (validated in builder).
    pub(crate) base_url: String,
    pub(crate) image: ImageEmbedConfig,
    /// Embed the print stylesheet in exported HTML documents
    pub(crate) styled_export: bool,
    /// Render ordered lists as `1.` items instead of bullets on the
    /// storage to Markdown path
    pub(crate) number_ordered_lists: bool,
}
