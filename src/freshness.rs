// src/freshness.rs
//! TTL check for the cached feed.

use chrono::{DateTime, Duration, Utc};

use crate::cache::CacheEntry;

pub const DEFAULT_TTL_SECS: i64 = 1800;

/// `(now - stored_at) < ttl`. An entry stored "in the future" (clock skew) counts as fresh.
pub fn is_fresh(entry: &CacheEntry, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(entry.stored_at) < ttl
}

#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    ttl: Duration,
}

impl FreshnessPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_secs(secs: u64) -> Self {
        let secs = secs.min(i64::MAX as u64 / 1_000) as i64;
        Self::new(Duration::seconds(secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// No entry is never fresh.
    pub fn allows(&self, entry: Option<&CacheEntry>, now: DateTime<Utc>) -> bool {
        entry.is_some_and(|e| is_fresh(e, now, self.ttl))
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}
