//! Test utilities shared by the integration tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kodegen_tools_confluence::{FetchError, FetchFuture, FetchResponse, UrlFetcher};
use mockito::{Mock, Server};

#[allow(dead_code)]
pub const BASE_URL: &str = "https://example.atlassian.net/wiki";

/// Install a tracing subscriber honoring `RUST_LOG` (idempotent)
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// PNG signature followed by filler, `len` bytes in total
#[allow(dead_code)]
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    bytes.resize(len.max(bytes.len()), 0xAB);
    bytes.truncate(len);
    bytes
}

/// In-memory fetcher that records every requested URL
#[derive(Default)]
#[allow(dead_code)]
pub struct MockFetcher {
    responses: HashMap<String, Result<FetchResponse, FetchError>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: FetchResponse) -> Self {
        self.responses.insert(url.to_string(), Ok(response));
        self
    }

    pub fn with_error(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    /// Hold every response for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Highest number of fetches observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl UrlFetcher for MockFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(url.to_string());
            }
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match self.responses.get(url) {
                Some(response) => response.clone(),
                None => Ok(FetchResponse {
                    status: 404,
                    ..FetchResponse::default()
                }),
            }
        })
    }
}

/// Creates a mock endpoint serving image bytes
#[allow(dead_code)]
pub async fn create_image_mock(
    server: &mut Server,
    path: &str,
    body: &[u8],
    content_type: &str,
) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", content_type)
        .with_body(body)
        .create_async()
        .await
}

/// Creates a mock endpoint that returns an error
#[allow(dead_code)]
pub async fn create_error_mock(server: &mut Server, path: &str, status: usize) -> Mock {
    server
        .mock("GET", path)
        .with_status(status)
        .with_body("Error")
        .create_async()
        .await
}

/// Creates a mock endpoint that returns a redirect
#[allow(dead_code)]
pub async fn create_redirect_mock(server: &mut Server, from: &str, to: &str) -> Mock {
    server
        .mock("GET", from)
        .with_status(302)
        .with_header("location", to)
        .create_async()
        .await
}
