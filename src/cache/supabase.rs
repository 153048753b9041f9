// src/cache/supabase.rs
//! Remote table backend (Supabase / PostgREST).
//!
//! Every save inserts a row; `load` selects the most recent one by `updated_at`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{stamp, CacheEntry, CacheStore};
use crate::error::CacheStoreError;
use crate::ingest::types::Feed;

pub const DEFAULT_TABLE: &str = "news_cache";

pub struct SupabaseCacheStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
    write_lock: tokio::sync::Mutex<()>,
}

#[derive(Debug, Serialize)]
struct NewRow<'a> {
    data: &'a CacheEntry,
    last_updated: f64,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct LatestRow {
    data: CacheEntry,
}

impl SupabaseCacheStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, CacheStoreError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: table.into(),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, CacheStoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(CacheStoreError::Remote(format!("{status}: {}", body.trim())))
    }
}

#[async_trait]
impl CacheStore for SupabaseCacheStore {
    async fn load(&self) -> Result<Option<CacheEntry>, CacheStoreError> {
        let resp = self
            .authed(self.http.get(self.table_url()))
            .query(&[
                ("select", "data"),
                ("order", "updated_at.desc"),
                ("limit", "1"),
            ])
            .send()
            .await?;
        let rows: Vec<LatestRow> = Self::check(resp).await?.json().await?;
        Ok(rows.into_iter().next().map(|r| r.data))
    }

    async fn save(&self, feed: &Feed) -> Result<CacheEntry, CacheStoreError> {
        let _guard = self.write_lock.lock().await;
        let prev = self.load().await?;
        let entry = stamp(feed, prev.as_ref())?;

        let row = NewRow {
            data: &entry,
            last_updated: entry.stored_at.timestamp_millis() as f64 / 1_000.0,
            updated_at: entry.stored_at.to_rfc3339(),
        };
        let resp = self
            .authed(self.http.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        Self::check(resp).await?;
        tracing::info!(target: "feed", table = %self.table, articles = entry.feed.articles.len(), "cache row inserted");
        Ok(entry)
    }

    fn backend(&self) -> &'static str {
        "supabase"
    }
}
