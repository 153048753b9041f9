// src/cache/mod.rs
//! Single-entry feed cache: one logical `CacheEntry`, each save supersedes the last.

pub mod file;
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheStoreError;
use crate::ingest::types::Feed;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;
pub use supabase::SupabaseCacheStore;

/// Persisted wrapper around the latest feed.
/// On the wire: `{ "articles": [...], "generatedAt": .., "storedAt": .. }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(flatten)]
    pub feed: Feed,
    pub stored_at: DateTime<Utc>,
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<CacheEntry>, CacheStoreError>;

    /// Replace the stored entry. Saves are serialized; a reader never sees a partial write.
    async fn save(&self, feed: &Feed) -> Result<CacheEntry, CacheStoreError>;

    fn backend(&self) -> &'static str;
}

/// Build the entry that replaces `prev`.
///
/// A feed generated before the stored one is `Superseded`. `stored_at` never
/// goes backwards and never precedes `generated_at`.
pub(crate) fn stamp(feed: &Feed, prev: Option<&CacheEntry>) -> Result<CacheEntry, CacheStoreError> {
    let mut stored_at = Utc::now().max(feed.generated_at);
    if let Some(prev) = prev {
        if feed.generated_at < prev.feed.generated_at {
            return Err(CacheStoreError::Superseded {
                incoming: feed.generated_at,
                stored: prev.feed.generated_at,
            });
        }
        stored_at = stored_at.max(prev.stored_at);
    }
    Ok(CacheEntry {
        feed: feed.clone(),
        stored_at,
    })
}
