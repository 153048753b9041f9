// src/cache/file.rs
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, sync::Mutex};

use super::{stamp, CacheEntry, CacheStore};
use crate::error::CacheStoreError;
use crate::ingest::types::Feed;

pub const DEFAULT_CACHE_PATH: &str = "cache/news_cache.json";

/// One JSON document on disk, replaced via write-to-temp + rename.
pub struct FileCacheStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entry(&self) -> Result<Option<CacheEntry>, CacheStoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self) -> Result<Option<CacheEntry>, CacheStoreError> {
        self.read_entry().await
    }

    async fn save(&self, feed: &Feed) -> Result<CacheEntry, CacheStoreError> {
        let _guard = self.write_lock.lock().await;

        // A corrupt document must not wedge the cache forever.
        let prev = match self.read_entry().await {
            Ok(prev) => prev,
            Err(CacheStoreError::Json(e)) => {
                tracing::warn!(target: "feed", path = %self.path.display(), error = %e, "replacing unreadable cache file");
                None
            }
            Err(e) => return Err(e),
        };
        let entry = stamp(feed, prev.as_ref())?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&entry)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(entry)
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
