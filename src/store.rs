//! The durable key-value store collaborator.
//!
//! Job documents are opaque JSON strings with a TTL measured from the most
//! recent write; there is no explicit delete. The trait is the seam for a
//! real external store (e.g. Redis `SET key value EX ttl`), while
//! [`MemoryStore`] backs tests and single-process deployments.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{ErrorKind, Result};

/// Default retention window for job documents, from the last write
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Durable key-value store with per-key expiry
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Read a value; `None` when the key never existed or has expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value and (re)start its retention window
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process store with lazy expiry
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // The shard guard must be dropped before removing the expired key
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    return Ok(Some(entry.value.clone()));
                }
                true
            }
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            ErrorKind::Store(format!("TTL of {ttl:?} overflows the clock"))
        })?;
        self.entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }
}
