//! Breadth-first traversal of same-domain pages.
//!
//! The crawl is an iterative BFS with an explicit visited set and a FIFO
//! frontier, so memory stays bounded and deep sites cannot blow the stack.
//! Fetch failures mark the page as failed and the traversal continues; the
//! failed page's children are simply never discovered.

use std::collections::{HashSet, VecDeque};

use url::Url;

use crate::detector::detect;
use crate::extract::extract_links;
use crate::fetcher::PageFetcher;
use crate::types::{JobOptions, LinkCandidate, LinkKind, ProtectionSignal};

/// Default maximum number of pages visited per crawl
pub const DEFAULT_PAGE_CAP: usize = 2000;

/// Default maximum link depth from the crawl root. Deliberately generous:
/// the page cap is the practical limit.
pub const DEFAULT_DEPTH_CAP: usize = 1024;

/// Everything a finished traversal hands to the check phase
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    /// URLs of all visited pages, in visit order (failed ones included)
    pub crawled_pages: Vec<String>,
    /// Pages that could not be fetched, with the reason
    pub failed_pages: Vec<(String, String)>,
    /// All discovered candidates, deduplicated by URL (first occurrence wins)
    pub candidates: Vec<LinkCandidate>,
    /// Protection signals of the pages that triggered any
    pub signals: Vec<(String, ProtectionSignal)>,
}

/// Same-domain breadth-first crawler
#[derive(Debug, Clone)]
pub struct Crawler {
    fetcher: PageFetcher,
    options: JobOptions,
    page_cap: usize,
    depth_cap: usize,
}

impl Crawler {
    /// Create a crawler over the given fetcher and extraction options
    #[must_use]
    pub fn new(fetcher: PageFetcher, options: JobOptions, page_cap: usize, depth_cap: usize) -> Self {
        Self {
            fetcher,
            options,
            page_cap,
            depth_cap,
        }
    }

    /// Traverse pages breadth-first starting at `root`.
    ///
    /// Only hyperlinks whose hostname exactly matches the root's hostname
    /// are enqueued; every other candidate is still discovered for the
    /// check phase. No URL is visited twice.
    pub async fn crawl(&self, root: &Url) -> CrawlOutcome {
        let mut outcome = CrawlOutcome::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut discovered: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<(Url, usize)> = VecDeque::new();

        let root_host = root.host_str().unwrap_or_default().to_string();
        frontier.push_back((root.clone(), 0));

        while let Some((url, depth)) = frontier.pop_front() {
            if outcome.crawled_pages.len() >= self.page_cap {
                break;
            }
            let page_url = url.to_string();
            if !visited.insert(page_url.clone()) {
                continue;
            }

            let page = match self.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    log::debug!("crawl: failed to fetch {page_url}: {e}");
                    outcome.failed_pages.push((page_url.clone(), e.to_string()));
                    outcome.crawled_pages.push(page_url);
                    continue;
                }
            };
            outcome.crawled_pages.push(page_url);

            let signal = detect(&page.html);
            if signal.detected() {
                outcome.signals.push((page.url.to_string(), signal));
            }

            for candidate in extract_links(&page.html, &page.url, &self.options) {
                if candidate.kind == LinkKind::Hyperlink
                    && candidate.url.host_str() == Some(root_host.as_str())
                    && depth + 1 < self.depth_cap
                {
                    let child = candidate.url.to_string();
                    if !visited.contains(&child) {
                        frontier.push_back((candidate.url.clone(), depth + 1));
                    }
                }
                if discovered.insert(candidate.url.to_string()) {
                    outcome.candidates.push(candidate);
                }
            }
        }

        log::debug!(
            "crawl: visited {} pages, discovered {} unique links",
            outcome.crawled_pages.len(),
            outcome.candidates.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::fetcher::MAX_PAGE_BYTES;

    async fn serve_page(server: &MockServer, page_path: &str, html: String) {
        Mock::given(method("GET"))
            .and(path(page_path))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(html, "text/html"),
            )
            .mount(server)
            .await;
    }

    fn crawler(page_cap: usize) -> Crawler {
        let fetcher = PageFetcher::new(Duration::from_millis(500), MAX_PAGE_BYTES).unwrap();
        Crawler::new(fetcher, JobOptions::default(), page_cap, DEFAULT_DEPTH_CAP)
    }

    #[tokio::test]
    async fn test_visits_each_page_once() {
        let server = MockServer::start().await;
        let body = |links: &str| format!("<html><body>{links} and plenty of filler text so the page is not empty {}</body></html>", "lorem ipsum ".repeat(20));
        // / links to /a and /b; /a links back to /; /b links to /a again
        serve_page(&server, "/", body(r#"<a href="/a">a</a> <a href="/b">b</a>"#)).await;
        serve_page(&server, "/a", body(r#"<a href="/">home</a>"#)).await;
        serve_page(&server, "/b", body(r#"<a href="/a">a</a>"#)).await;

        let root = Url::parse(&format!("{}/", server.uri())).unwrap();
        let outcome = crawler(100).crawl(&root).await;

        let mut pages = outcome.crawled_pages.clone();
        pages.sort();
        let mut unique = pages.clone();
        unique.dedup();
        assert_eq!(pages, unique, "no page may be visited twice");
        assert_eq!(outcome.crawled_pages.len(), 3);
        assert!(outcome.failed_pages.is_empty());
    }

    #[tokio::test]
    async fn test_page_cap_is_respected() {
        let server = MockServer::start().await;
        for i in 0..10 {
            let html = format!(
                "<html><body><a href=\"/p{}\">next</a> plenty of text {}</body></html>",
                i + 1,
                "filler ".repeat(30)
            );
            serve_page(&server, &format!("/p{i}"), html).await;
        }

        let root = Url::parse(&format!("{}/p0", server.uri())).unwrap();
        let outcome = crawler(4).crawl(&root).await;
        assert_eq!(outcome.crawled_pages.len(), 4);
    }

    #[tokio::test]
    async fn test_external_links_discovered_but_not_crawled() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><body><a href=\"https://elsewhere.example.com/page\">ext</a> text {}</body></html>",
            "words ".repeat(30)
        );
        serve_page(&server, "/", html).await;

        let root = Url::parse(&format!("{}/", server.uri())).unwrap();
        let outcome = crawler(100).crawl(&root).await;

        assert_eq!(outcome.crawled_pages.len(), 1);
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(
            outcome.candidates[0].url.as_str(),
            "https://elsewhere.example.com/page"
        );
    }

    #[tokio::test]
    async fn test_failed_page_does_not_stop_the_crawl() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><body><a href=\"/broken\">broken</a> <a href=\"/fine\">fine</a> {}</body></html>",
            "more text ".repeat(30)
        );
        serve_page(&server, "/", html).await;
        serve_page(&server, "/fine", format!("<html><body>all good here {}</body></html>", "yes ".repeat(40))).await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("%PDF", "application/pdf"),
            )
            .mount(&server)
            .await;

        let root = Url::parse(&format!("{}/", server.uri())).unwrap();
        let outcome = crawler(100).crawl(&root).await;

        assert_eq!(outcome.crawled_pages.len(), 3);
        assert_eq!(outcome.failed_pages.len(), 1);
        assert!(outcome.failed_pages[0].0.ends_with("/broken"));
        assert_eq!(outcome.failed_pages[0].1, "Not an HTML page");
    }

    #[tokio::test]
    async fn test_candidates_deduplicated_first_wins() {
        let server = MockServer::start().await;
        let filler = "content ".repeat(30);
        serve_page(
            &server,
            "/",
            format!("<html><body><a href=\"/a\">a</a> <a href=\"/shared\">s</a> {filler}</body></html>"),
        )
        .await;
        serve_page(
            &server,
            "/a",
            format!("<html><body><a href=\"/shared\">s again</a> {filler}</body></html>"),
        )
        .await;
        serve_page(&server, "/shared", format!("<html><body>{filler}</body></html>")).await;

        let root = Url::parse(&format!("{}/", server.uri())).unwrap();
        let outcome = crawler(100).crawl(&root).await;

        let shared: Vec<_> = outcome
            .candidates
            .iter()
            .filter(|c| c.url.path() == "/shared")
            .collect();
        assert_eq!(shared.len(), 1);
        // First discovery was on the root page
        assert!(shared[0].source_page.ends_with("/"));
    }
}
