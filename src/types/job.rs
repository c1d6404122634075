use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CheckedLink, ErrorKind, ProtectionWarning};

/// Lifecycle state of a job.
///
/// The state is monotonic: `Queued` → `Processing` → `Completed`/`Failed`,
/// and terminal once completed or failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, driver not yet started
    Queued,
    /// The detached driver is running
    Processing,
    /// Finished normally; results and stats are final
    Completed,
    /// Aborted with an unrecoverable error; see `Job::error`
    Failed,
}

impl JobStatus {
    /// Whether the job will not change state anymore
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a job does with its target URL
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// Check all links referenced by one page
    Single,
    /// Crawl same-domain pages breadth-first, then check everything found
    Crawl,
}

impl FromStr for CheckMode {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "crawl" => Ok(Self::Crawl),
            other => Err(ErrorKind::InvalidMode(other.to_string())),
        }
    }
}

/// Per-job toggles for which candidate kinds get extracted and checked
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Also extract and check images, `srcset` entries and media sources
    #[serde(default)]
    pub check_images: bool,
    /// Also extract and check stylesheets, scripts and resource hints
    #[serde(default)]
    pub check_css_js: bool,
    /// Only check links pointing away from the target's hostname
    #[serde(default)]
    pub external_only: bool,
}

/// Incremental counters a concurrent poller can observe while a job runs.
/// Both counters never decrease within a job.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    /// Completed link checks so far
    pub checked: usize,
    /// Pages visited by the crawl (1 in single mode)
    pub crawled_pages: usize,
}

/// Aggregated result counts over a job's checked links.
///
/// Invariant: `total == working + broken + redirects`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    /// All checked links
    pub total: usize,
    /// Links with a 2xx final status
    pub working: usize,
    /// Links with a 4xx/5xx status or a transport failure (status 0)
    pub broken: usize,
    /// Links with a 3xx final status
    pub redirects: usize,
}

impl JobStats {
    /// Recompute the stats from a result list
    #[must_use]
    pub fn tally(results: &[CheckedLink]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };
        for link in results {
            if link.is_working() {
                stats.working += 1;
            } else if link.is_redirect() {
                stats.redirects += 1;
            } else {
                stats.broken += 1;
            }
        }
        stats
    }
}

/// The full job document persisted in the durable store and returned to
/// pollers. Mutated only by the job's own driver; results are append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Opaque unique job id
    pub id: String,
    /// Current lifecycle state
    pub status: JobStatus,
    /// The validated, normalized target URL
    pub url: String,
    /// Single page or crawl
    pub mode: CheckMode,
    /// Extraction/checking toggles
    #[serde(default)]
    pub options: JobOptions,
    /// Monotonic counters for pollers
    #[serde(default)]
    pub progress: JobProgress,
    /// Checked links in completion order; grows, never shrinks
    #[serde(default)]
    pub results: Vec<CheckedLink>,
    /// Aggregated counts over `results`
    #[serde(default)]
    pub stats: JobStats,
    /// URLs of pages visited during the crawl
    #[serde(default)]
    pub crawled_pages: Vec<String>,
    /// Set when the page content looked bot-mitigated or script-rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_warning: Option<ProtectionWarning>,
    /// Terminal error message when `status == failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// Last persisted write
    pub updated_at: DateTime<Utc>,
    /// When the job reached a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a fresh queued job for a validated target URL
    #[must_use]
    pub fn new(url: &str, mode: CheckMode, options: JobOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Queued,
            url: url.to_string(),
            mode,
            options,
            progress: JobProgress::default(),
            results: Vec::new(),
            stats: JobStats::default(),
            crawled_pages: Vec::new(),
            protection_warning: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// What `submit` hands back to the caller: the id to poll plus the initial
/// status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTicket {
    /// The id of the accepted job
    pub job_id: String,
    /// Always `queued` at submission time
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::LinkKind;

    fn checked(status: u16) -> CheckedLink {
        CheckedLink {
            url: "https://example.org/".to_string(),
            kind: LinkKind::Hyperlink,
            source_page: "https://example.org/".to_string(),
            status,
            status_text: String::new(),
            response_time_ms: 1,
            redirect_chain: Vec::new(),
            final_url: None,
            checked: true,
            error: None,
        }
    }

    #[test]
    fn test_stats_tally_identity() {
        let results = vec![
            checked(200),
            checked(204),
            checked(301),
            checked(404),
            checked(500),
            checked(0),
            checked(408),
        ];
        let stats = JobStats::tally(&results);
        assert_eq!(stats.total, 7);
        assert_eq!(stats.working, 2);
        assert_eq!(stats.redirects, 1);
        assert_eq!(stats.broken, 4);
        assert_eq!(
            stats.total,
            stats.working + stats.broken + stats.redirects
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("single".parse::<CheckMode>().unwrap(), CheckMode::Single);
        assert_eq!("crawl".parse::<CheckMode>().unwrap(), CheckMode::Crawl);
        assert!("recursive".parse::<CheckMode>().is_err());
    }

    #[test]
    fn test_job_document_roundtrip() {
        let mut job = Job::new("https://example.org/", CheckMode::Single, JobOptions::default());
        job.results.push(checked(200));
        job.stats = JobStats::tally(&job.results);

        let raw = serde_json::to_string(&job).unwrap();
        assert!(raw.contains("\"createdAt\""));
        assert!(raw.contains("\"status\":\"queued\""));

        let back: Job = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.id, job.id);
        assert_eq!(back.results.len(), 1);
        assert_eq!(back.stats, job.stats);
    }
}
