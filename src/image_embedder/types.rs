//! Type definitions for image embedding

use serde::{Deserialize, Serialize};

/// Metadata for one `<img>` reference found during an embedding pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedImage {
    /// Resolved absolute URL (or the raw `src` when it could not be resolved)
    pub url: String,
    pub mime_type: String,
    /// Size of the fetched body; 0 when nothing was fetched
    pub size_bytes: usize,
    /// Base64 payload when the image was inlined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    pub embedded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmbeddedImage {
    pub(crate) fn pending(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: mime_type.into(),
            size_bytes: 0,
            base64: None,
            embedded: false,
            error: None,
        }
    }

    pub(crate) fn failed(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Rewritten HTML plus per-image records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEmbedResult {
    pub html: String,
    pub images: Vec<EmbeddedImage>,
}

impl ImageEmbedResult {
    /// Total number of image references processed
    #[must_use]
    pub fn total(&self) -> usize {
        self.images.len()
    }

    /// Number of images inlined as data URIs
    #[must_use]
    pub fn embedded_count(&self) -> usize {
        self.images.iter().filter(|image| image.embedded).count()
    }

    /// Images that carry an error
    pub fn failures(&self) -> impl Iterator<Item = &EmbeddedImage> {
        self.images.iter().filter(|image| image.error.is_some())
    }

    /// Check if any failures occurred
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Get failure rate as a ratio between 0.0 and 1.0
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.failures().count() as f64 / total as f64
        }
    }
}
