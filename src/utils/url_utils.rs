//! URL utilities shared by the image embedder and the document assembler.

use anyhow::{Context, Result};
use url::Url;

/// Resolve a potentially relative URL against a base URL
///
/// Absolute references are returned normalized; root-relative references
/// (`/wiki/...`) replace the base path; relative references are joined per
/// RFC 3986.
pub fn resolve_url(base_url: &str, url: &str) -> Result<String> {
    let base = Url::parse(base_url).context("Invalid base URL")?;
    let resolved = base.join(url.trim()).context("Failed to resolve URL")?;
    Ok(resolved.to_string())
}

/// Check whether two absolute URLs share scheme, host and port.
///
/// Unparseable URLs are never same-origin.
#[must_use]
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

/// Check if a base URL is usable for resolution (absolute http/https)
#[must_use]
pub fn is_valid_base_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}

/// Last path segment's extension, lowercased, ignoring query and fragment.
#[must_use]
pub fn path_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}
