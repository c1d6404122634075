//! Construction of the outbound HTTP clients.
//!
//! Two clients are built from the same browser-like header set: the page
//! fetcher follows redirects transparently, while the link checker gets a
//! client with redirects disabled so it can record every hop itself.

use std::time::Duration;

use http::header::{self, HeaderMap, HeaderValue};

use crate::{ErrorKind, Result};

/// TCP connect timeout, separate from the per-request deadline
const CONNECT_TIMEOUT: u64 = 10;

/// Redirect cap for page fetches; link checks follow redirects manually
const FETCH_MAX_REDIRECTS: usize = 10;

// Realistic browser headers reduce false blocking by anti-automation
// layers (e.g. Sucuri/Cloudproxy returning 403 for unknown agents).
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

pub(crate) fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    headers
}

/// Client for retrieving pages; follows redirects up to a fixed cap.
pub(crate) fn build_fetch_client() -> Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .gzip(true)
        .default_headers(browser_headers())
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
        .redirect(reqwest::redirect::Policy::limited(FETCH_MAX_REDIRECTS))
        .build()
        .map_err(ErrorKind::BuildRequestClient)
}

/// Client for probing candidate links; never follows redirects on its own,
/// so each hop is visible to the checker.
pub(crate) fn build_check_client() -> Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .gzip(true)
        .default_headers(browser_headers())
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(ErrorKind::BuildRequestClient)
}
