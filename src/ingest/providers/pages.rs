// src/ingest/providers/pages.rs
//! Page transport used by the HTML fetchers: live HTTP or in-memory fixtures.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Fetch one page as text. Transport errors and non-2xx statuses are `Err`.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct HttpPages {
    client: reqwest::Client,
}

impl HttpPages {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_UA)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building page http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPages {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} status"))?;
        resp.text().await.with_context(|| format!("GET {url} body"))
    }
}

/// Pages served from memory, keyed by exact URL. Missing URLs fail like a 404.
#[derive(Debug, Default, Clone)]
pub struct FixturePages {
    pages: HashMap<String, String>,
}

impl FixturePages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl PageSource for FixturePages {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture page for {url}"))
    }
}
