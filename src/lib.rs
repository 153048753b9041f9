// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod freshness;
pub mod ingest;
pub mod metrics;
pub mod refresh;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::error::{CacheStoreError, RefreshError, SourceError};
pub use crate::ingest::types::{Article, Feed, SourceFetcher};
pub use crate::refresh::{FeedStatus, RefreshCoordinator, ServedFeed};
