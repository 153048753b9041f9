// tests/common/mod.rs
// Mock fetchers shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tech_news_api::ingest::types::{Article, SourceFetcher, CONTENT_UNAVAILABLE};

pub fn article(source: &str, n: usize) -> Article {
    Article {
        source: source.to_string(),
        title: format!("{source} story {n}"),
        link: format!("https://{}.example/{n}", source.to_ascii_lowercase()),
        content: CONTENT_UNAVAILABLE.to_string(),
        image: "https://picsum.photos/300/200?random=0".to_string(),
        fetched_at: Utc::now(),
    }
}

pub enum Behavior {
    Ok(usize),
    Fail(&'static str),
    Panic,
}

/// Configurable fetcher: returns `n` articles, fails, or panics, after an optional delay.
/// Counts every call.
pub struct MockFetcher {
    pub name: &'static str,
    pub behavior: Behavior,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl MockFetcher {
    pub fn ok(name: &'static str, n: usize) -> Arc<Self> {
        Self::build(name, Behavior::Ok(n), Duration::ZERO)
    }

    pub fn failing(name: &'static str, why: &'static str) -> Arc<Self> {
        Self::build(name, Behavior::Fail(why), Duration::ZERO)
    }

    pub fn panicking(name: &'static str) -> Arc<Self> {
        Self::build(name, Behavior::Panic, Duration::ZERO)
    }

    pub fn slow(name: &'static str, n: usize, delay: Duration) -> Arc<Self> {
        Self::build(name, Behavior::Ok(n), delay)
    }

    pub fn build(name: &'static str, behavior: Behavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.behavior {
            Behavior::Ok(n) => Ok((0..n).map(|i| article(self.name, i)).collect()),
            Behavior::Fail(why) => Err(anyhow!(why)),
            Behavior::Panic => panic!("{} exploded", self.name),
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub fn dyn_fetchers(fs: &[Arc<MockFetcher>]) -> Vec<Arc<dyn SourceFetcher>> {
    fs.iter()
        .map(|f| Arc::clone(f) as Arc<dyn SourceFetcher>)
        .collect()
}

/// Slow fetcher that records how many fetches overlap.
pub struct TrackingFetcher {
    pub delay: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TrackingFetcher {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for TrackingFetcher {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![article("Tracked", 0)])
    }

    fn name(&self) -> &str {
        "Tracked"
    }
}
