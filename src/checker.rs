//! Verification of one candidate link, including manual redirect following.

use std::time::{Duration, Instant};

use http::{header, Method, StatusCode};
use url::Url;

use crate::client::build_check_client;
use crate::types::{CheckedLink, LinkCandidate, RedirectHop};
use crate::Result;

/// Maximum redirect hops recorded per link; longer chains are truncated
pub const MAX_REDIRECTS: usize = 5;

/// Default deadline per probe attempt
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Status codes after which the lightweight HEAD probe is retried as a full
/// GET. Some servers reject HEAD outright or anti-automation layers treat
/// it as suspicious.
const RETRY_WITH_GET: &[u16] = &[400, 403, 405];

/// Outcome of one probe attempt against a single URL
struct Probe {
    status: StatusCode,
    location: Option<String>,
    elapsed: Duration,
}

enum ProbeError {
    Timeout(Duration),
    Transport(String, Duration),
}

/// Checks candidate links for reachability.
///
/// Redirects are not followed by the transport; the checker reads each
/// `Location` header itself so the full hop chain can be recorded.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: reqwest::Client,
    timeout: Duration,
    max_redirects: usize,
}

impl LinkChecker {
    /// Create a checker with the given per-probe deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying request client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_check_client()?,
            timeout,
            max_redirects: MAX_REDIRECTS,
        })
    }

    /// Check a single candidate link.
    ///
    /// This never fails: timeouts come back as `status = 408`, any other
    /// transport failure as `status = 0` with the raw error text, so a
    /// batch of checks always runs to completion.
    pub async fn check(&self, candidate: &LinkCandidate) -> CheckedLink {
        let mut chain: Vec<RedirectHop> = Vec::new();
        let mut current = candidate.url.clone();

        let (status, status_text, elapsed, error) = loop {
            match self.probe(&current).await {
                Ok(probe) => {
                    if probe.status.is_redirection() && chain.len() < self.max_redirects {
                        let next = probe
                            .location
                            .as_deref()
                            .and_then(|location| current.join(location).ok());
                        if let Some(next) = next {
                            chain.push(RedirectHop {
                                from: current.to_string(),
                                to: next.to_string(),
                                status: probe.status.as_u16(),
                            });
                            current = next;
                            continue;
                        }
                    }
                    break (
                        probe.status.as_u16(),
                        probe
                            .status
                            .canonical_reason()
                            .unwrap_or_default()
                            .to_string(),
                        probe.elapsed,
                        None,
                    );
                }
                Err(ProbeError::Timeout(elapsed)) => {
                    break (408, "Request Timeout".to_string(), elapsed, Some("Timeout".to_string()));
                }
                Err(ProbeError::Transport(message, elapsed)) => {
                    break (0, String::new(), elapsed, Some(message));
                }
            }
        };

        // A link that redirected and then resolved is reported under the
        // first hop's 3xx status; `final_url` and the chain carry where it
        // ended up. A chain ending in a failure keeps the failing status.
        let (status, status_text) = if (200..300).contains(&status) && !chain.is_empty() {
            let first = chain[0].status;
            (first, reason_phrase(first))
        } else {
            (status, status_text)
        };

        let final_url = (current != candidate.url).then(|| current.to_string());

        CheckedLink {
            url: candidate.url.to_string(),
            kind: candidate.kind,
            source_page: candidate.source_page.clone(),
            status,
            status_text,
            response_time_ms: elapsed.as_millis() as u64,
            redirect_chain: chain,
            final_url,
            checked: true,
            error,
        }
    }

    /// One probe against one URL: HEAD first, retried as GET when the
    /// response suggests the method itself was the problem.
    async fn probe(&self, url: &Url) -> std::result::Result<Probe, ProbeError> {
        let start = Instant::now();
        match self.request(Method::HEAD, url).await {
            Ok(response) if RETRY_WITH_GET.contains(&response.status().as_u16()) => {
                let start = Instant::now();
                match self.request(Method::GET, url).await {
                    Ok(response) => Ok(probe_of(&response, start.elapsed())),
                    Err(e) => Err(classify(&e, start.elapsed())),
                }
            }
            Ok(response) => Ok(probe_of(&response, start.elapsed())),
            Err(e) => Err(classify(&e, start.elapsed())),
        }
    }

    async fn request(&self, method: Method, url: &Url) -> reqwest::Result<reqwest::Response> {
        self.client
            .request(method, url.clone())
            .timeout(self.timeout)
            .send()
            .await
    }
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

fn probe_of(response: &reqwest::Response, elapsed: Duration) -> Probe {
    Probe {
        status: response.status(),
        location: response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        elapsed,
    }
}

fn classify(e: &reqwest::Error, elapsed: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(elapsed)
    } else {
        ProbeError::Transport(e.to_string(), elapsed)
    }
}
