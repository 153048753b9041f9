// src/config/feed.rs
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::cache::{
    file::DEFAULT_CACHE_PATH, supabase::DEFAULT_TABLE, CacheStore, FileCacheStore,
    MemoryCacheStore, SupabaseCacheStore,
};
use crate::freshness::{FreshnessPolicy, DEFAULT_TTL_SECS};
use crate::refresh::DEFAULT_FETCH_TIMEOUT;

fn default_pacing_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    File(PathBuf),
    Memory,
    Supabase {
        url: String,
        key: String,
        table: String,
    },
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub ttl_secs: u64,
    /// 0 disables the background timer.
    pub refresh_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub pacing_ms: u64,
    pub backend: CacheBackend,
}

impl FeedConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env` over an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let num = |key: &str| get(key).and_then(|v| v.trim().parse::<u64>().ok());

        let ttl_secs = num("TTL_SECONDS")
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TTL_SECS as u64);
        // Interval follows the TTL unless set explicitly.
        let refresh_interval_secs = num("REFRESH_INTERVAL").unwrap_or(ttl_secs);
        let fetch_timeout_secs = num("FETCH_TIMEOUT_SECS")
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT.as_secs());
        let pacing_ms = num("PACING_MS").unwrap_or_else(default_pacing_ms);

        let backend_name = get("CACHE_BACKEND")
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "file".to_string());
        let backend = match backend_name.as_str() {
            "file" => CacheBackend::File(
                get("CACHE_PATH")
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            ),
            "memory" => CacheBackend::Memory,
            "supabase" => CacheBackend::Supabase {
                url: get("SUPABASE_URL").context("CACHE_BACKEND=supabase needs SUPABASE_URL")?,
                key: get("SUPABASE_SERVICE_KEY")
                    .context("CACHE_BACKEND=supabase needs SUPABASE_SERVICE_KEY")?,
                table: get("SUPABASE_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            },
            other => bail!("unsupported CACHE_BACKEND: {other}"),
        };

        Ok(Self {
            ttl_secs,
            refresh_interval_secs,
            fetch_timeout_secs,
            pacing_ms,
            backend,
        })
    }

    pub fn policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::from_secs(self.ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn build_store(&self) -> Result<Arc<dyn CacheStore>> {
        Ok(match &self.backend {
            CacheBackend::File(path) => Arc::new(FileCacheStore::new(path.clone())),
            CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
            CacheBackend::Supabase { url, key, table } => Arc::new(
                SupabaseCacheStore::new(url.clone(), key.clone(), table.clone())
                    .context("building supabase cache client")?,
            ),
        })
    }
}
