//! Configuration module for the markup pipeline
//!
//! This module provides the `MarkupConfig` struct and its type-safe builder
//! with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{MarkupConfigBuilder, WithBaseUrl};
pub use types::{ImageEmbedConfig, MarkupConfig};
