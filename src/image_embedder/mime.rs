//! MIME type resolution for fetched images

use crate::utils::path_extension;

const FALLBACK_MIME: &str = "application/octet-stream";

/// MIME type for an image extension, if known
#[must_use]
pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(mime)
}

/// Resolve the MIME type of a fetched image.
///
/// An `image/*` content-type header wins; otherwise the URL's file extension
/// decides; otherwise any non-empty header; otherwise
/// `application/octet-stream`.
#[must_use]
pub fn resolve_mime(content_type: Option<&str>, url: &str) -> String {
    let header = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    if let Some(header) = &header
        && header.starts_with("image/")
    {
        return header.clone();
    }

    if let Some(mime) = path_extension(url).as_deref().and_then(mime_from_extension) {
        return mime.to_string();
    }

    header.unwrap_or_else(|| FALLBACK_MIME.to_string())
}

/// MIME type guess from the URL alone (used when nothing is fetched)
#[must_use]
pub fn guess_mime(url: &str) -> String {
    resolve_mime(None, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_wins() {
        assert_eq!(resolve_mime(Some("image/gif; charset=binary"), "/x.png"), "image/gif");
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(resolve_mime(None, "/download/x.PNG?version=1"), "image/png");
        assert_eq!(resolve_mime(Some("application/octet-stream"), "/x.jpg"), "image/jpeg");
    }

    #[test]
    fn test_unknown_everything() {
        assert_eq!(resolve_mime(None, "/thumbnail"), "application/octet-stream");
        assert_eq!(resolve_mime(Some("text/plain"), "/thumbnail"), "text/plain");
    }
}
