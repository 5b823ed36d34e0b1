//! Getter methods for `MarkupConfig`

use super::types::{ImageEmbedConfig, MarkupConfig};

impl MarkupConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn image(&self) -> &ImageEmbedConfig {
        &self.image
    }

    #[must_use]
    pub fn styled_export(&self) -> bool {
        self.styled_export
    }

    #[must_use]
    pub fn number_ordered_lists(&self) -> bool {
        self.number_ordered_lists
    }
}
