//! `sitecheck` checks the links and assets of a website in the background.
//!
//! A submitted job fetches the target page (or crawls the whole domain),
//! extracts every referenced URL, probes each one concurrently with manual
//! redirect tracking, and persists a pollable job document in a TTL
//! key-value store. "Hello world" example:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sitecheck::{CheckMode, JobManager, JobOptions, ManagerConfig, MemoryStore, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = JobManager::new(Arc::new(MemoryStore::new()), ManagerConfig::default())?;
//!     let ticket = manager
//!         .submit("example.org", CheckMode::Single, JobOptions::default())
//!         .await?;
//!     // ...later, from anywhere holding the manager:
//!     if let Some(job) = manager.poll(&ticket.job_id).await? {
//!         println!("{}: {} links checked", job.status, job.stats.total);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The pieces compose: [`validate`](validate::validate) normalizes and
//! authorizes the target, [`fetcher::PageFetcher`] retrieves pages,
//! [`extract::extract_links`] and [`detector::detect`] analyze the HTML,
//! [`checker::LinkChecker`] probes candidates, and
//! [`processor::JobManager`] wires it all together over a [`store::Store`].

mod client;
mod types;

pub mod checker;
pub mod crawler;
pub mod detector;
pub mod extract;
pub mod fetcher;
pub mod limiter;
pub mod processor;
pub mod store;
pub mod validate;

pub use processor::{JobManager, ManagerConfig};
pub use store::{MemoryStore, Store};
pub use types::*;
