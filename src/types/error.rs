use thiserror::Error;

/// Possible errors when interacting with `sitecheck`
///
/// Note that per-link and per-page failures are deliberately *not* part of
/// this enum. They are recorded as data on [`CheckedLink`](super::CheckedLink)
/// and [`FetchError`](crate::fetcher::FetchError) so that a batch of checks
/// can always run to completion.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The submitted target URL was rejected before a job was created
    #[error("Invalid target URL `{0}`: {1}")]
    InvalidTarget(String, String),
    /// The submitted check mode is not recognized
    #[error("Unknown check mode `{0}`, expected `single` or `crawl`")]
    InvalidMode(String),
    /// The reqwest client cannot be created
    #[error("Failed to build request client")]
    BuildRequestClient(#[source] reqwest::Error),
    /// Reading from or writing to the durable store failed
    #[error("Store operation failed: {0}")]
    Store(String),
    /// A job document could not be (de)serialized
    #[error("Failed to serialize job document")]
    JobDocument(#[from] serde_json::Error),
}
