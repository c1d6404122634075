//! Job orchestration: accept a target, run the pipeline in a detached task,
//! persist the evolving job document so callers can poll it.
//!
//! The submitting caller only waits for validation and the initial persist;
//! everything else happens in a spawned driver that owns the job document
//! and writes it back periodically. Pollers read whatever snapshot is
//! current; results only ever grow.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use typed_builder::TypedBuilder;
use url::Url;

use crate::checker::{LinkChecker, DEFAULT_LINK_TIMEOUT};
use crate::crawler::{Crawler, DEFAULT_DEPTH_CAP, DEFAULT_PAGE_CAP};
use crate::detector::detect;
use crate::extract::extract_links;
use crate::fetcher::{PageFetcher, DEFAULT_PAGE_TIMEOUT, MAX_PAGE_BYTES};
use crate::limiter::{Limiter, DEFAULT_CONCURRENCY};
use crate::store::{Store, DEFAULT_TTL};
use crate::types::{
    CheckMode, Job, JobOptions, JobStats, JobStatus, JobTicket, LinkCandidate, ProtectionSignal,
    ProtectionWarning,
};
use crate::validate::validate_with;
use crate::Result;

/// In single mode, the document is persisted after this many checks
const SINGLE_PERSIST_EVERY: usize = 5;

/// In crawl mode, checks arrive in bigger batches, so persist less often
const CRAWL_PERSIST_EVERY: usize = 10;

/// Hard cap on results kept per job, protecting the store document size
pub const MAX_RESULTS: usize = 10_000;

/// Tunables for the whole pipeline; the defaults match a polite public
/// deployment.
#[derive(Copy, Clone, Debug, TypedBuilder)]
pub struct ManagerConfig {
    /// Simultaneous in-flight link checks per job
    #[builder(default = DEFAULT_CONCURRENCY)]
    pub max_concurrency: usize,
    /// Deadline per link probe
    #[builder(default = DEFAULT_LINK_TIMEOUT)]
    pub link_timeout: Duration,
    /// Deadline per page fetch
    #[builder(default = DEFAULT_PAGE_TIMEOUT)]
    pub page_timeout: Duration,
    /// Largest accepted page body
    #[builder(default = MAX_PAGE_BYTES)]
    pub max_page_bytes: usize,
    /// Most pages visited per crawl
    #[builder(default = DEFAULT_PAGE_CAP)]
    pub page_cap: usize,
    /// Deepest link distance followed from the crawl root
    #[builder(default = DEFAULT_DEPTH_CAP)]
    pub depth_cap: usize,
    /// Retention window of the job document, from its last write
    #[builder(default = DEFAULT_TTL)]
    pub ttl: Duration,
    /// Admit loopback/private targets (intranet deployments, local testing)
    #[builder(default = false)]
    pub allow_private_hosts: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Accepts jobs and answers polls.
///
/// Cheap to share behind an `Arc`; each accepted job gets its own detached
/// driver task and its own concurrency limiter.
pub struct JobManager {
    store: Arc<dyn Store>,
    fetcher: PageFetcher,
    checker: LinkChecker,
    config: ManagerConfig,
}

impl JobManager {
    /// Create a manager over the given store.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying request clients cannot be built.
    pub fn new(store: Arc<dyn Store>, config: ManagerConfig) -> Result<Self> {
        Ok(Self {
            fetcher: PageFetcher::new(config.page_timeout, config.max_page_bytes)?,
            checker: LinkChecker::new(config.link_timeout)?,
            store,
            config,
        })
    }

    /// Validate the target, persist a queued job document and start its
    /// driver. Returns immediately with the id to poll.
    ///
    /// # Errors
    ///
    /// Returns an error when the target URL is rejected or the initial
    /// persist fails; in both cases no job exists afterwards.
    pub async fn submit(
        &self,
        raw_url: &str,
        mode: CheckMode,
        options: JobOptions,
    ) -> Result<JobTicket> {
        let url = validate_with(raw_url, self.config.allow_private_hosts)?;
        let job = Job::new(url.as_str(), mode, options);
        let ticket = JobTicket {
            job_id: job.id.clone(),
            status: job.status,
        };

        let runner = JobRunner {
            store: Arc::clone(&self.store),
            fetcher: self.fetcher.clone(),
            checker: self.checker.clone(),
            limiter: Limiter::new(self.config.max_concurrency),
            config: self.config,
        };
        // The submission itself must fail loudly when the store is down;
        // later writes are best-effort.
        runner.persist(&job).await?;
        log::info!("job {}: accepted {} ({})", job.id, job.url, job.mode_name());
        tokio::spawn(runner.run(job));

        Ok(ticket)
    }

    /// Look up the current snapshot of a job. `None` means the id is
    /// unknown or the document has expired.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails or holds a corrupt document.
    pub async fn poll(&self, job_id: &str) -> Result<Option<Job>> {
        match self.store.get(&job_key(job_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

impl Job {
    fn mode_name(&self) -> &'static str {
        match self.mode {
            CheckMode::Single => "single",
            CheckMode::Crawl => "crawl",
        }
    }
}

fn job_key(job_id: &str) -> String {
    format!("job:{job_id}")
}

/// The detached driver of one job. Owns the job document for the job's
/// entire lifetime; nothing else writes it.
struct JobRunner {
    store: Arc<dyn Store>,
    fetcher: PageFetcher,
    checker: LinkChecker,
    limiter: Limiter,
    config: ManagerConfig,
}

impl JobRunner {
    async fn run(self, mut job: Job) {
        job.status = JobStatus::Processing;
        job.updated_at = Utc::now();
        self.persist_best_effort(&job).await;

        let outcome = match job.mode {
            CheckMode::Single => self.run_single(&mut job).await,
            CheckMode::Crawl => self.run_crawl(&mut job).await,
        };

        match outcome {
            Ok(()) => job.status = JobStatus::Completed,
            Err(reason) => {
                log::warn!("job {}: failed: {reason}", job.id);
                job.status = JobStatus::Failed;
                job.error = Some(reason);
            }
        }

        job.stats = JobStats::tally(&job.results);
        let now = Utc::now();
        job.updated_at = now;
        job.completed_at = Some(now);
        self.persist_best_effort(&job).await;
        log::info!(
            "job {}: {} ({} checked, {} broken)",
            job.id,
            job.status,
            job.stats.total,
            job.stats.broken
        );
    }

    /// Fetch one page, extract its references and check them all. A page
    /// that cannot be fetched fails the job.
    async fn run_single(&self, job: &mut Job) -> std::result::Result<(), String> {
        let url = parse_job_url(&job.url)?;
        let page = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| format!("Failed to fetch page: {e}"))?;

        job.crawled_pages = vec![page.url.to_string()];
        job.progress.crawled_pages = 1;

        let signal = detect(&page.html);
        let candidates = dedupe_by_url(extract_links(&page.html, &page.url, &job.options));
        let no_links = candidates.is_empty();

        let signals = vec![(page.url.to_string(), signal)];
        job.protection_warning = build_warning(&signals, no_links);
        job.updated_at = Utc::now();
        self.persist_best_effort(job).await;

        let candidates = apply_external_filter(candidates, &url, job.options.external_only);
        self.check_all(job, candidates, SINGLE_PERSIST_EVERY).await;
        Ok(())
    }

    /// Crawl the whole domain, then check everything discovered. Individual
    /// page failures are tolerated; only an invalid root fails the job.
    async fn run_crawl(&self, job: &mut Job) -> std::result::Result<(), String> {
        let url = parse_job_url(&job.url)?;
        let crawler = Crawler::new(
            self.fetcher.clone(),
            job.options,
            self.config.page_cap,
            self.config.depth_cap,
        );
        let outcome = crawler.crawl(&url).await;

        job.crawled_pages = outcome.crawled_pages;
        job.progress.crawled_pages = job.crawled_pages.len();
        job.protection_warning =
            build_warning(&outcome.signals, outcome.candidates.is_empty());
        job.updated_at = Utc::now();
        self.persist_best_effort(job).await;

        let candidates =
            apply_external_filter(outcome.candidates, &url, job.options.external_only);
        self.check_all(job, candidates, CRAWL_PERSIST_EVERY).await;
        Ok(())
    }

    /// Fan the candidates out over the limiter and collect results in
    /// completion order, persisting a snapshot every `persist_every` checks.
    async fn check_all(&self, job: &mut Job, mut candidates: Vec<LinkCandidate>, persist_every: usize) {
        let remaining = MAX_RESULTS.saturating_sub(job.results.len());
        if candidates.len() > remaining {
            log::warn!(
                "job {}: capping {} candidates to {remaining}",
                job.id,
                candidates.len()
            );
            candidates.truncate(remaining);
        }

        let mut in_flight: FuturesUnordered<_> = candidates
            .into_iter()
            .map(|candidate| {
                let checker = self.checker.clone();
                let limiter = self.limiter.clone();
                async move {
                    let _permit = limiter.acquire().await;
                    checker.check(&candidate).await
                }
            })
            .collect();

        let mut since_persist = 0;
        while let Some(checked) = in_flight.next().await {
            job.results.push(checked);
            job.progress.checked = job.results.len();
            since_persist += 1;
            if since_persist >= persist_every {
                since_persist = 0;
                job.stats = JobStats::tally(&job.results);
                job.updated_at = Utc::now();
                self.persist_best_effort(job).await;
            }
        }
    }

    async fn persist(&self, job: &Job) -> Result<()> {
        let raw = serde_json::to_string(job)?;
        self.store
            .set_with_ttl(&job_key(&job.id), raw, self.config.ttl)
            .await
    }

    /// Intermediate snapshots tolerate store hiccups; the driver keeps
    /// going and the next write carries the full state anyway.
    async fn persist_best_effort(&self, job: &Job) {
        if let Err(e) = self.persist(job).await {
            log::warn!("job {}: could not persist snapshot: {e}", job.id);
        }
    }
}

/// The stored URL was validated at submission; failure here means the
/// document was tampered with or the store corrupted it.
fn parse_job_url(raw: &str) -> std::result::Result<Url, String> {
    Url::parse(raw).map_err(|e| format!("Invalid target URL: {e}"))
}

fn dedupe_by_url(candidates: Vec<LinkCandidate>) -> Vec<LinkCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.to_string()))
        .collect()
}

/// Keep only candidates pointing away from the target's hostname when the
/// job asked for external links only.
fn apply_external_filter(
    candidates: Vec<LinkCandidate>,
    root: &Url,
    external_only: bool,
) -> Vec<LinkCandidate> {
    if !external_only {
        return candidates;
    }
    let root_host = root.host_str().unwrap_or_default().to_string();
    candidates
        .into_iter()
        .filter(|c| c.url.host_str() != Some(root_host.as_str()))
        .collect()
}

/// Aggregate per-page signals into the job-level warning. `None` when no
/// signal fired anywhere and links were found.
fn build_warning(
    signals: &[(String, ProtectionSignal)],
    no_links: bool,
) -> Option<ProtectionWarning> {
    let any = signals.iter().any(|(_, s)| s.detected());
    if !any && !no_links {
        return None;
    }

    let mut warning = ProtectionWarning::default();
    if signals.iter().any(|(_, s)| s.cloudflare) {
        warning.categories.push("Cloudflare".to_string());
    }
    if signals.iter().any(|(_, s)| s.recaptcha) {
        warning.categories.push("reCAPTCHA".to_string());
    }
    if signals.iter().any(|(_, s)| s.js_required) {
        warning.categories.push("JavaScript-Required".to_string());
    }
    if signals.iter().any(|(_, s)| s.empty_body) {
        warning.categories.push("Empty-Content".to_string());
    }
    if no_links {
        warning.categories.push("No-Links-Found".to_string());
    }
    for (page, signal) in signals {
        for detail in &signal.details {
            warning.details.push(format!("{page}: {detail}"));
        }
    }
    Some(warning)
}
