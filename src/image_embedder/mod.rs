//! Inline same-origin images as base64 data URIs
//!
//! Every `<img src>` in the document is resolved against the site base URL.
//! Same-origin images are fetched through the injected [`UrlFetcher`] (at most
//! `max_concurrent_fetches` at a time, each under its own timeout) and their
//! `src` rewritten to a `data:` URI. Cross-origin references are never
//! fetched. A failed fetch leaves its tag untouched and is recorded on that
//! image's metadata; it never fails the document.

pub mod fetcher;
pub mod mime;
pub mod types;

pub use fetcher::{FetchError, FetchFuture, FetchResponse, ReqwestFetcher, UrlFetcher};
pub use types::{EmbeddedImage, ImageEmbedResult};

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine;
use futures::future::join_all;
use html_escape::decode_html_entities;
use lol_html::errors::RewritingError;
use lol_html::{HtmlRewriter, Settings, element};
use scraper::{Html, Selector};
use tokio::sync::Semaphore;

use crate::config::ImageEmbedConfig;
use crate::utils::{resolve_url, same_origin};

static IMG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img[src]").expect("IMG_SELECTOR: hardcoded selector is valid")
});

enum Plan {
    Done(EmbeddedImage),
    Fetch { url: String },
}

struct Inlined {
    mime_type: String,
    size_bytes: usize,
    payload: String,
}

/// Rewrites same-origin image references into data URIs
#[derive(Debug, Clone)]
pub struct ImageEmbedder {
    base_url: String,
    config: ImageEmbedConfig,
}

impl ImageEmbedder {
    #[must_use]
    pub fn new(base_url: impl Into<String>, config: ImageEmbedConfig) -> Self {
        Self {
            base_url: base_url.into(),
            config,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Embed images in `html`.
    ///
    /// With `enabled == false` nothing is fetched and the HTML is returned
    /// unchanged together with metadata-only records.
    pub async fn embed<F>(&self, html: &str, fetcher: &F, enabled: bool) -> ImageEmbedResult
    where
        F: UrlFetcher + ?Sized,
    {
        let sources = find_image_sources(html);
        if sources.is_empty() {
            return ImageEmbedResult {
                html: html.to_string(),
                images: Vec::new(),
            };
        }

        let plans: Vec<(String, Plan)> = sources
            .into_iter()
            .filter(|src| !is_data_uri(src))
            .map(|src| {
                let plan = self.plan(&src, enabled);
                (src, plan)
            })
            .collect();

        let mut urls: Vec<&str> = Vec::new();
        for (_, plan) in &plans {
            if let Plan::Fetch { url } = plan
                && !urls.contains(&url.as_str())
            {
                urls.push(url);
            }
        }
        let fetched = self.fetch_all(&urls, fetcher).await;

        let mut images = Vec::with_capacity(plans.len());
        let mut replacements: HashMap<String, String> = HashMap::new();

        for (src, plan) in plans {
            match plan {
                Plan::Done(record) => images.push(record),
                Plan::Fetch { url } => match fetched.get(url.as_str()) {
                    Some(Ok(inlined)) => {
                        replacements.insert(
                            src,
                            format!("data:{};base64,{}", inlined.mime_type, inlined.payload),
                        );
                        images.push(EmbeddedImage {
                            url,
                            mime_type: inlined.mime_type.clone(),
                            size_bytes: inlined.size_bytes,
                            base64: Some(inlined.payload.clone()),
                            embedded: true,
                            error: None,
                        });
                    }
                    Some(Err(error)) => {
                        let mime = mime::guess_mime(&url);
                        images.push(EmbeddedImage::pending(url, mime).failed(error.to_string()));
                    }
                    None => {
                        let mime = mime::guess_mime(&url);
                        images.push(EmbeddedImage::pending(url, mime).failed("image was not fetched"));
                    }
                },
            }
        }

        if replacements.is_empty() {
            return ImageEmbedResult {
                html: html.to_string(),
                images,
            };
        }

        match replace_image_sources(html, &replacements) {
            Ok(html) => ImageEmbedResult { html, images },
            Err(e) => {
                log::warn!("Failed to rewrite image sources: {e}");
                let images = images
                    .into_iter()
                    .map(|image| {
                        if image.embedded {
                            let mime = image.mime_type.clone();
                            EmbeddedImage::pending(image.url, mime)
                                .failed(format!("HTML rewrite error: {e}"))
                        } else {
                            image
                        }
                    })
                    .collect();
                ImageEmbedResult {
                    html: html.to_string(),
                    images,
                }
            }
        }
    }

    /// Decide what to do with one `src` value
    fn plan(&self, src: &str, enabled: bool) -> Plan {
        let url = match resolve_url(&self.base_url, src) {
            Ok(url) => url,
            Err(e) => {
                log::debug!("Cannot resolve image reference '{src}': {e}");
                let record = EmbeddedImage::pending(src, mime::guess_mime(src));
                return Plan::Done(if enabled {
                    record.failed(format!("unresolvable image URL: {e}"))
                } else {
                    record
                });
            }
        };

        if !enabled {
            let mime = mime::guess_mime(&url);
            return Plan::Done(EmbeddedImage::pending(url, mime));
        }

        if !same_origin(&url, &self.base_url) {
            log::debug!("Skipping cross-origin image {url}");
            let mime = mime::guess_mime(&url);
            return Plan::Done(
                EmbeddedImage::pending(url, mime).failed("cross-origin image not fetched"),
            );
        }

        Plan::Fetch { url }
    }

    /// Fetch every distinct URL once, bounded by the concurrency limit
    async fn fetch_all<F>(
        &self,
        urls: &[&str],
        fetcher: &F,
    ) -> HashMap<String, Result<Inlined, FetchError>>
    where
        F: UrlFetcher + ?Sized,
    {
        let semaphore = Semaphore::new(self.config.max_concurrent_fetches.max(1));
        let timeout = self.config.fetch_timeout();
        let max_bytes = self.config.max_image_bytes;

        let futures = urls.iter().map(|url| {
            let semaphore = &semaphore;
            async move {
                let result = async {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| FetchError::Request(format!("Semaphore error: {e}")))?;

                    let response = tokio::time::timeout(timeout, fetcher.fetch(url))
                        .await
                        .map_err(|_| FetchError::Timeout(timeout))??;

                    inline_response(url, &response, max_bytes)
                }
                .await;

                if let Err(e) = &result {
                    log::warn!("Failed to embed image from {url}: {e}");
                }
                ((*url).to_string(), result)
            }
        });

        join_all(futures).await.into_iter().collect()
    }
}

/// Validate a response and encode its body
fn inline_response(
    url: &str,
    response: &FetchResponse,
    max_bytes: usize,
) -> Result<Inlined, FetchError> {
    if !response.is_success() {
        return Err(FetchError::Status(response.status));
    }
    if response.data.len() > max_bytes {
        return Err(FetchError::TooLarge {
            size: response.data.len(),
            limit: max_bytes,
        });
    }

    let mime_type = mime::resolve_mime(response.content_type(), url);
    let mut payload = String::with_capacity(base64::encoded_len(response.data.len(), true).unwrap_or(0));
    base64::engine::general_purpose::STANDARD.encode_string(&response.data, &mut payload);

    Ok(Inlined {
        mime_type,
        size_bytes: response.data.len(),
        payload,
    })
}

/// Embed images using default settings.
pub async fn embed_images<F>(
    html: &str,
    base_url: &str,
    fetcher: &F,
    enabled: bool,
) -> ImageEmbedResult
where
    F: UrlFetcher + ?Sized,
{
    ImageEmbedder::new(base_url, ImageEmbedConfig::default())
        .embed(html, fetcher, enabled)
        .await
}

fn is_data_uri(src: &str) -> bool {
    src.trim_start()
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}

/// Entity-decoded `src` of every `<img>` element, in document order.
///
/// Markup inside comments and raw-text elements such as `<script>` is not
/// part of the element tree and is never reported.
fn find_image_sources(html: &str) -> Vec<String> {
    let document = Html::parse_fragment(html);
    document
        .select(&IMG_SELECTOR)
        .filter_map(|element| element.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
        .collect()
}

/// Rewrite `src` on `<img>` elements whose source has a replacement.
///
/// Everything else passes through byte for byte.
fn replace_image_sources(
    html: &str,
    replacements: &HashMap<String, String>,
) -> Result<String, RewritingError> {
    let mut output = Vec::with_capacity(html.len());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("img[src]", |el| {
                if let Some(src) = el.get_attribute("src") {
                    let src = decode_html_entities(&src);
                    if let Some(data_uri) = replacements.get(src.trim()) {
                        el.set_attribute("src", data_uri)?;
                    }
                }
                Ok(())
            })],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );
    rewriter.write(html.as_bytes())?;
    rewriter.end()?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFetcher {
        calls: AtomicUsize,
        body: Vec<u8>,
    }

    impl UrlFetcher for StaticFetcher {
        fn fetch<'a>(&'a self, _url: &'a str) -> FetchFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self.body.clone();
            Box::pin(async move { Ok::<_, FetchError>(FetchResponse::ok(body, None)) })
        }
    }

    fn fetcher() -> StaticFetcher {
        StaticFetcher {
            calls: AtomicUsize::new(0),
            body: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_find_image_sources_reads_src_only() {
        let html = r#"<p><img alt="a src=x" data-src="/lazy.png" src='/real.png'><img src=""></p>"#;
        assert_eq!(find_image_sources(html), vec!["/real.png".to_string()]);
    }

    #[test]
    fn test_find_image_sources_skips_comments_and_scripts() {
        let html = concat!(
            r#"<!-- <img src="/commented.png"> -->"#,
            r#"<script>document.write('<img src="/scripted.png">')</script>"#,
            r#"<textarea><img src="/typed.png"></textarea>"#,
            r#"<img src="/real.png?a=1&amp;b=2">"#,
        );
        assert_eq!(find_image_sources(html), vec!["/real.png?a=1&b=2".to_string()]);
    }

    #[test]
    fn test_replace_image_sources_leaves_other_markup() {
        let replacements =
            HashMap::from([("/a.png".to_string(), "data:image/png;base64,AQID".to_string())]);
        let html = r#"<!-- <img src="/a.png"> --><p class=x><img src="/a.png" alt="A"><img src="/b.png"></p>"#;
        let rewritten = replace_image_sources(html, &replacements).unwrap();
        assert_eq!(
            rewritten,
            r#"<!-- <img src="/a.png"> --><p class=x><img src="data:image/png;base64,AQID" alt="A"><img src="/b.png"></p>"#
        );
    }

    #[tokio::test]
    async fn test_duplicate_sources_fetched_once() {
        let fetcher = fetcher();
        let embedder = ImageEmbedder::new("https://example.com/wiki", ImageEmbedConfig::default());
        let result = embedder
            .embed(r#"<img src="/a.png"><img src="/a.png">"#, &fetcher, true)
            .await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.embedded_count(), 2);
        assert_eq!(result.html.matches("data:image/png;base64,AQID").count(), 2);
    }

    #[tokio::test]
    async fn test_hidden_images_are_not_fetched() {
        let fetcher = fetcher();
        let embedder = ImageEmbedder::new("https://example.com", ImageEmbedConfig::default());
        let html = r#"<!-- <img src="/old.png"> --><script>var t = '<img src="/x.png">';</script>"#;
        let result = embedder.embed(html, &fetcher, true).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.html, html);
        assert!(result.images.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_records_metadata_only() {
        let fetcher = fetcher();
        let embedder = ImageEmbedder::new("https://example.com/wiki", ImageEmbedConfig::default());
        let html = r#"<img src="/a.png">"#;
        let result = embedder.embed(html, &fetcher, false).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.html, html);
        assert_eq!(result.images.len(), 1);
        assert_eq!(result.images[0].url, "https://example.com/a.png");
        assert!(!result.images[0].embedded);
        assert!(result.images[0].error.is_none());
    }

    #[tokio::test]
    async fn test_data_uri_sources_are_skipped() {
        let fetcher = fetcher();
        let embedder = ImageEmbedder::new("https://example.com", ImageEmbedConfig::default());
        let html = r#"<img src="data:image/gif;base64,R0lGOD">"#;
        let result = embedder.embed(html, &fetcher, true).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.html, html);
        assert!(result.images.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let fetcher = fetcher();
        let config = ImageEmbedConfig {
            max_image_bytes: 2,
            ..ImageEmbedConfig::default()
        };
        let embedder = ImageEmbedder::new("https://example.com", config);
        let html = r#"<img src="/a.png">"#;
        let result = embedder.embed(html, &fetcher, true).await;

        assert_eq!(result.html, html);
        assert_eq!(result.embedded_count(), 0);
        let error = result.images[0].error.as_deref().unwrap_or_default();
        assert!(error.contains("too large"), "unexpected error: {error}");
    }
}
