// src/cache/memory.rs
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{stamp, CacheEntry, CacheStore};
use crate::error::CacheStoreError;
use crate::ingest::types::Feed;

/// Process-local store. Used for `CACHE_BACKEND=memory` and in tests.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    inner: RwLock<Option<CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing entry (e.g. one stored "1801 seconds ago").
    pub fn seeded(entry: CacheEntry) -> Self {
        Self {
            inner: RwLock::new(Some(entry)),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self) -> Result<Option<CacheEntry>, CacheStoreError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, feed: &Feed) -> Result<CacheEntry, CacheStoreError> {
        let mut slot = self.inner.write().await;
        let entry = stamp(feed, slot.as_ref())?;
        *slot = Some(entry.clone());
        Ok(entry)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn absent_then_saved() {
        let store = MemoryCacheStore::new();
        assert!(store.load().await.unwrap().is_none());

        let feed = Feed::empty(Utc::now());
        let saved = store.save(&feed).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn older_feed_does_not_overwrite_newer() {
        let store = MemoryCacheStore::new();
        let t2 = Utc::now();
        let t1 = t2 - Duration::seconds(5);

        store.save(&Feed::empty(t2)).await.unwrap();
        let late = store.save(&Feed::empty(t1)).await;
        assert!(matches!(late, Err(CacheStoreError::Superseded { .. })));

        let kept = store.load().await.unwrap().unwrap();
        assert_eq!(kept.feed.generated_at, t2);
    }
}
