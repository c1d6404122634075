//! Retrieval of one page's HTML, with content-type, size and timeout guards.

use std::time::Duration;

use http::header;
use thiserror::Error;
use url::Url;

use crate::client::build_fetch_client;
use crate::Result;

/// Maximum accepted page body size (5 MiB)
pub const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

/// Default deadline for retrieving one page
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Why a page could not be fetched.
///
/// These are recorded as data: a failed page fails the job in single mode
/// and is skipped (with its children) in crawl mode, but never raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The response is not an HTML document
    #[error("Not an HTML page")]
    NotHtml,
    /// The declared or actual body size exceeds the limit
    #[error("Content too large")]
    TooLarge,
    /// The fetch exceeded its deadline and was cancelled
    #[error("Timeout")]
    Timeout,
    /// Any other transport-level failure
    #[error("{0}")]
    Transport(String),
}

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct Page {
    /// The decoded HTML body
    pub html: String,
    /// The response status code (interstitial pages often carry 403/503)
    pub status: u16,
    /// Where the page was actually served from, after redirects
    pub url: Url,
}

/// Retrieves pages over HTTP. Redirects are followed transparently here;
/// only candidate link *checking* tracks redirects manually.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl PageFetcher {
    /// Create a fetcher with the given per-page deadline and body size cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying request client cannot be built.
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self> {
        Ok(Self {
            client: build_fetch_client()?,
            timeout,
            max_bytes,
        })
    }

    /// Fetch one page. All failure modes come back as [`FetchError`] values;
    /// this function never panics and never propagates transport errors.
    pub async fn fetch(&self, url: &Url) -> std::result::Result<Page, FetchError> {
        match tokio::time::timeout(self.timeout, self.fetch_inner(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    async fn fetch_inner(&self, url: &Url) -> std::result::Result<Page, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !is_html(content_type) {
            return Err(FetchError::NotHtml);
        }

        // The declared length is checked first so oversized bodies are
        // rejected without reading them...
        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(FetchError::TooLarge);
            }
        }

        // ...but the header can lie (or be absent), so the actual bytes are
        // counted as well.
        let mut body = Vec::new();
        let mut response = response;
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Page {
            html: String::from_utf8_lossy(&body).into_owned(),
            status,
            url: final_url,
        })
    }
}

fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e.to_string())
    }
}
