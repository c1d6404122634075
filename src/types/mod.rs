mod candidate;
mod checked;
mod error;
mod job;
mod signal;

pub use candidate::{LinkCandidate, LinkKind};
pub use checked::{CheckedLink, RedirectHop};
pub use error::ErrorKind;
pub use job::{CheckMode, Job, JobOptions, JobProgress, JobStats, JobStatus, JobTicket};
pub use signal::{ProtectionSignal, ProtectionWarning};

/// The sitecheck `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
