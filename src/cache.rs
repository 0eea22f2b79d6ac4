use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::review::Review;
use crate::store::KeyValueStore;

pub const CACHE_KEY: &str = "github_reviews_cache";
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Expires(Duration),
    NoExpiry,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Expires(DEFAULT_TTL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct CacheEntry {
    reviews: Vec<Review>,
    /// Unix millis of the last write.
    timestamp: i64,
}

/// Time-boxed cache of the remote review list, one JSON blob under a fixed key.
pub struct ReviewCache<S> {
    store: S,
    policy: CachePolicy,
}

impl<S: KeyValueStore> ReviewCache<S> {
    pub fn new(store: S, policy: CachePolicy) -> Self {
        Self { store, policy }
    }

    fn read_entry(&self) -> Option<CacheEntry> {
        let raw = match self.store.get(CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read review cache");
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "corrupted review cache, ignoring");
                None
            }
        }
    }

    /// Cached records if the entry is still within the validity window.
    pub fn get_cached(&self, now: DateTime<Utc>) -> Option<Vec<Review>> {
        let entry = self.read_entry()?;
        let fresh = match self.policy {
            CachePolicy::NoExpiry => true,
            CachePolicy::Expires(ttl) => {
                let age_ms = now.timestamp_millis() - entry.timestamp;
                age_ms >= 0 && (age_ms as u128) < ttl.as_millis()
            }
        };
        if fresh {
            debug!(count = entry.reviews.len(), "review cache hit");
            Some(entry.reviews)
        } else {
            debug!("review cache expired");
            None
        }
    }

    /// Cached records regardless of age.
    pub fn get_stale(&self) -> Option<Vec<Review>> {
        self.read_entry().map(|entry| entry.reviews)
    }

    pub fn put_cache(&self, reviews: &[Review], now: DateTime<Utc>) -> Result<()> {
        let entry = CacheEntry {
            reviews: reviews.to_vec(),
            timestamp: now.timestamp_millis(),
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| Error::Store(format!("failed to serialize review cache: {e}")))?;
        self.store.set(CACHE_KEY, &json)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(CACHE_KEY)
    }
}
