//! Bounds the number of concurrent outbound checks within one job.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default cap on simultaneous in-flight link checks per job
pub const DEFAULT_CONCURRENCY: usize = 10;

/// A counting semaphore around a job's batch of link checks.
///
/// A released slot is immediately available to the next queued unit of
/// work. No ordering is implied among completions.
#[derive(Debug, Clone)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
}

impl Limiter {
    /// Create a limiter with the given number of slots (at least one)
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(cap.max(1))),
        }
    }

    /// Wait for a free slot. The slot is held until the permit is dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore must not be closed")
    }

    /// Currently free slots
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}
