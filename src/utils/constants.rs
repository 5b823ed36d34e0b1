//! Shared configuration constants for the markup pipeline
//!
//! This module contains default values and limits used throughout the
//! codebase to ensure consistency and avoid magic numbers.

/// Maximum element nesting depth kept by the markup tree builder.
///
/// Deeper start tags are flattened into their parent. Every recursive pass
/// (sanitizer serialization, AST reading, rendering) is bounded by this.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Maximum nesting of block containers (lists, blockquotes) accepted by the
/// Markdown reader. Content of deeper containers joins the innermost open one
/// so that generated storage stays well inside [`MAX_NESTING_DEPTH`].
pub const MAX_BLOCK_NESTING: usize = 32;

/// Maximum nesting of inline constructs (emphasis inside links inside emphasis...)
/// accepted by the Markdown reader.
pub const MAX_INLINE_NESTING: usize = 16;

/// Default timeout for a single image fetch: 30 seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default maximum size for an inlined image: 5MB
///
/// Images larger than this are not inlined as data URIs; the reference is
/// left untouched and the failure is recorded on the image metadata.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Default cap on concurrent image fetches for one document
///
/// Keeps large exports from flooding the wiki origin with parallel requests.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Language parameter used for code macros without an explicit language
pub const DEFAULT_CODE_LANGUAGE: &str = "none";

/// User agent sent by the default HTTP fetcher
pub const DEFAULT_USER_AGENT: &str = concat!("kodegen-tools-confluence/", env!("CARGO_PKG_VERSION"));
