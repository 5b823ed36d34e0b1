//! Dangerous URL scheme detection.

use html_escape::decode_html_entities;

/// Schemes that can carry executable or opaque inline content.
pub const DEFAULT_DANGEROUS_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

/// Attributes whose values are URLs and therefore subject to the scheme check.
pub const URL_ATTRIBUTES: &[&str] = &["href", "src", "ri:value", "cite"];

/// Check whether a (decoded) attribute value starts with one of `schemes`.
///
/// Browsers ignore ASCII whitespace and control characters inside a scheme
/// (`java\tscript:`), and a value may still carry one level of entity
/// encoding (`&#106;avascript:`). Both are normalized before comparing.
#[must_use]
pub fn is_dangerous_url<S: AsRef<str>>(value: &str, schemes: &[S]) -> bool {
    let decoded = decode_html_entities(value);
    [value, &*decoded]
        .iter()
        .any(|candidate| has_scheme(&normalize(candidate), schemes))
}

/// Raster image MIME types accepted as inline `data:` image sources.
const INLINE_IMAGE_TYPES: &[&str] = &[
    "data:image/png",
    "data:image/jpeg",
    "data:image/jpg",
    "data:image/gif",
    "data:image/webp",
    "data:image/bmp",
];

/// Check whether a value is an inlined raster image (`data:image/png;base64,...`).
///
/// SVG is excluded: it can carry script.
#[must_use]
pub fn is_inline_image(value: &str) -> bool {
    let normalized = normalize(value);
    INLINE_IMAGE_TYPES.iter().any(|prefix| {
        normalized
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with([';', ',']))
    })
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn has_scheme<S: AsRef<str>>(normalized: &str, schemes: &[S]) -> bool {
    schemes
        .iter()
        .any(|scheme| normalized.starts_with(scheme.as_ref()))
}
