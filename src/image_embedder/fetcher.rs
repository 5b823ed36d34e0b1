//! HTTP fetch capability used by the image embedder
//!
//! The embedder never talks to the network directly: callers inject a
//! [`UrlFetcher`]. [`ReqwestFetcher`] is the default implementation, streaming
//! bodies with a size ceiling and refusing redirects that leave the origin.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;

use crate::config::ImageEmbedConfig;

const MAX_REDIRECTS: usize = 10;

/// Error type for a single failed fetch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("image too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("request failed: {0}")]
    Request(String),
}

/// Response returned by a [`UrlFetcher`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub data: Vec<u8>,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
}

impl FetchResponse {
    /// Successful response with the given body and content type
    #[must_use]
    pub fn ok(data: Vec<u8>, content_type: Option<&str>) -> Self {
        let mut headers = HashMap::new();
        if let Some(content_type) = content_type {
            headers.insert("content-type".to_string(), content_type.to_string());
        }
        Self {
            status: 200,
            data,
            headers,
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Type alias for a boxed fetch future
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<FetchResponse, FetchError>> + Send + 'a>>;

/// Capability to fetch the bytes behind an absolute URL
pub trait UrlFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

/// Default fetcher backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: usize,
}

impl ReqwestFetcher {
    /// Build a fetcher with its own client from the embedding settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ImageEmbedConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.fetch_timeout())
            .redirect(same_origin_redirects())
            .build()
            .context("Failed to build HTTP client for image fetching")?;

        Ok(Self {
            client,
            timeout: config.fetch_timeout(),
            max_bytes: config.max_image_bytes,
        })
    }

    /// Wrap an existing client owned by the caller
    #[must_use]
    pub fn with_client(client: Client, config: &ImageEmbedConfig) -> Self {
        Self {
            client,
            timeout: config.fetch_timeout(),
            max_bytes: config.max_image_bytes,
        }
    }

    async fn fetch_streaming(&self, url: &str) -> std::result::Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "image/avif,image/webp,image/apng,image/*,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        // Enforce the limit before downloading when the length is known
        let expected_size = response.content_length().unwrap_or(0);
        if expected_size > self.max_bytes as u64 {
            return Err(FetchError::TooLarge {
                size: usize::try_from(expected_size).unwrap_or(usize::MAX),
                limit: self.max_bytes,
            });
        }

        let mut buffer = Vec::with_capacity(usize::try_from(expected_size).unwrap_or(0));
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| self.request_error(&e))?;

            // Check BEFORE accumulating
            let new_total = buffer.len() + chunk.len();
            if new_total > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size: new_total,
                    limit: self.max_bytes,
                });
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(FetchResponse {
            status: status.as_u16(),
            data: buffer,
            headers,
        })
    }

    fn request_error(&self, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(error.to_string())
        }
    }
}

impl UrlFetcher for ReqwestFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(self.fetch_streaming(url))
    }
}

/// Follow redirects only while they stay on the original origin
fn same_origin_redirects() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let same_origin = attempt
            .previous()
            .first()
            .is_some_and(|first| first.origin() == attempt.url().origin());
        if same_origin {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}
