// src/refresh.rs
//! Single-flight refresh around the feed cache.
//!
//! Holding `state` is the REFRESHING state: at most one aggregation runs at a
//! time and every cache write happens under it. While a run is in flight,
//! callers that already have a stale entry get it immediately; callers with
//! nothing cached wait for the in-flight result instead of starting another run.
//!
//! A run is spawned onto its own task together with the owned guard, so it
//! always completes and saves even if every caller waiting on it goes away.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::error::{RefreshError, SourceError};
use crate::freshness::FreshnessPolicy;
use crate::ingest::{self, types::Feed, types::SourceFetcher};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_cache_hits_total", "Requests served from a fresh cache entry.");
        describe_counter!(
            "feed_cache_stale_served_total",
            "Requests served a stale entry (refresh in flight or all sources failed)."
        );
        describe_counter!("feed_refresh_runs_total", "Aggregation runs started.");
        describe_gauge!("feed_last_refresh_ts", "Unix ts of the last completed refresh.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    /// Cache entry within TTL; no fetcher touched.
    Fresh,
    /// Produced by a run for this caller (or the run it waited on).
    Refreshed,
    /// Last known entry past its TTL.
    Stale,
    /// Nothing cached and every source failed.
    Unavailable,
}

impl FeedStatus {
    /// Value for the `X-Feed-Cache` response header.
    pub fn cache_header(self) -> &'static str {
        match self {
            FeedStatus::Fresh => "HIT",
            FeedStatus::Stale => "STALE",
            FeedStatus::Refreshed | FeedStatus::Unavailable => "MISS",
        }
    }
}

/// What a caller receives. `feed.articles` is always present, possibly empty.
#[derive(Debug, Clone)]
pub struct ServedFeed {
    pub feed: Feed,
    pub status: FeedStatus,
    /// `None` when the feed was never persisted (save failed, or unavailable).
    pub stored_at: Option<DateTime<Utc>>,
    pub errors: Vec<SourceError>,
}

impl ServedFeed {
    fn from_entry(entry: CacheEntry, status: FeedStatus, errors: Vec<SourceError>) -> Self {
        Self {
            feed: entry.feed,
            status,
            stored_at: Some(entry.stored_at),
            errors,
        }
    }
}

#[derive(Default)]
struct RefreshState {
    /// Result of the most recent run, handed to callers that waited on it.
    last: Option<ServedFeed>,
    /// Last entry this process saved; fallback when the store cannot be read.
    last_good: Option<CacheEntry>,
}

/// Everything a spawned run needs, shared with the coordinator.
struct Shared {
    store: Arc<dyn CacheStore>,
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    completed: AtomicU64,
    started: AtomicU64,
}

pub struct RefreshCoordinator {
    shared: Arc<Shared>,
    policy: FreshnessPolicy,
    fetch_timeout: Duration,
    state: Arc<Mutex<RefreshState>>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetchers: Vec<Arc<dyn SourceFetcher>>,
        policy: FreshnessPolicy,
    ) -> Self {
        ensure_metrics_described();
        Self {
            shared: Arc::new(Shared {
                store,
                fetchers,
                completed: AtomicU64::new(0),
                started: AtomicU64::new(0),
            }),
            policy,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            state: Arc::new(Mutex::new(RefreshState::default())),
        }
    }

    /// Upper bound for a single source fetch; exceeding it is a `SourceError`.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Number of aggregation runs started so far.
    pub fn runs_started(&self) -> u64 {
        self.shared.started.load(Ordering::Acquire)
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.try_lock().is_err()
    }

    pub async fn get_feed(&self) -> ServedFeed {
        self.get_feed_at(Utc::now()).await
    }

    /// Serve the cached feed if fresh at `now`, otherwise refresh (or join/skip
    /// an in-flight refresh, see module docs).
    pub async fn get_feed_at(&self, now: DateTime<Utc>) -> ServedFeed {
        // Read before loading: any run finishing after this point is visible below.
        let seen = self.shared.completed.load(Ordering::Acquire);

        let cached = match self.shared.load_cached().await {
            Some(entry) if self.policy.allows(Some(&entry), now) => {
                counter!("feed_cache_hits_total").increment(1);
                debug!(target: "feed", stored_at = %entry.stored_at, "cache hit");
                return ServedFeed::from_entry(entry, FeedStatus::Fresh, Vec::new());
            }
            other => other,
        };

        let state = match (Arc::clone(&self.state).try_lock_owned(), &cached) {
            (Ok(state), _) => state,
            (Err(_), Some(entry)) => {
                counter!("feed_cache_stale_served_total").increment(1);
                info!(target: "feed", stored_at = %entry.stored_at, "refresh in flight; serving stale feed");
                return ServedFeed::from_entry(entry.clone(), FeedStatus::Stale, Vec::new());
            }
            (Err(_), None) => {
                debug!(target: "feed", "nothing cached; waiting for in-flight refresh");
                Arc::clone(&self.state).lock_owned().await
            }
        };

        if self.shared.completed.load(Ordering::Acquire) != seen {
            if let Some(last) = state.last.clone() {
                debug!(target: "feed", status = ?last.status, "joined completed refresh");
                return last;
            }
        }

        self.spawn_refresh(state, cached).await
    }

    /// Refresh regardless of freshness (periodic timer). Returns `None` when a
    /// run is already in flight.
    pub async fn trigger_background_refresh(&self) -> Option<ServedFeed> {
        let Ok(state) = Arc::clone(&self.state).try_lock_owned() else {
            debug!(target: "feed", "refresh already in flight; skipping background tick");
            return None;
        };
        let cached = self.shared.load_cached().await;
        Some(self.spawn_refresh(state, cached).await)
    }

    /// The run owns the gate and lives on its own task: dropping the caller
    /// neither cancels it nor releases the gate early.
    async fn spawn_refresh(
        &self,
        state: OwnedMutexGuard<RefreshState>,
        cached: Option<CacheEntry>,
    ) -> ServedFeed {
        let shared = Arc::clone(&self.shared);
        let timeout = self.fetch_timeout;
        let fallback = cached.clone();
        let run = tokio::spawn(async move { shared.refresh(state, cached, timeout).await });

        match run.await {
            Ok(served) => served,
            Err(e) => {
                error!(target: "feed", error = %e, "refresh task aborted");
                match fallback {
                    Some(entry) => ServedFeed::from_entry(entry, FeedStatus::Stale, Vec::new()),
                    None => ServedFeed {
                        feed: Feed::empty(Utc::now()),
                        status: FeedStatus::Unavailable,
                        stored_at: None,
                        errors: Vec::new(),
                    },
                }
            }
        }
    }
}

impl Shared {
    async fn load_cached(&self) -> Option<CacheEntry> {
        match self.store.load().await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: "feed", backend = self.store.backend(), error = %e, "cache load failed; treating as absent");
                None
            }
        }
    }

    async fn refresh(
        &self,
        mut state: OwnedMutexGuard<RefreshState>,
        cached: Option<CacheEntry>,
        fetch_timeout: Duration,
    ) -> ServedFeed {
        let run = self.started.fetch_add(1, Ordering::AcqRel) + 1;
        counter!("feed_refresh_runs_total").increment(1);
        info!(target: "feed", run, sources = self.fetchers.len(), "refresh started");

        let outcome = ingest::run_once(&self.fetchers, fetch_timeout).await;

        let served = if outcome.all_failed() {
            let err = RefreshError::AllSourcesFailed {
                errors: outcome.errors.clone(),
            };
            match cached.or_else(|| state.last_good.clone()) {
                Some(entry) => {
                    warn!(target: "feed", run, error = %err, stored_at = %entry.stored_at, "falling back to last good feed");
                    counter!("feed_cache_stale_served_total").increment(1);
                    ServedFeed::from_entry(entry, FeedStatus::Stale, outcome.errors)
                }
                None => {
                    error!(target: "feed", run, error = %err, "no feed available");
                    ServedFeed {
                        feed: outcome.feed,
                        status: FeedStatus::Unavailable,
                        stored_at: None,
                        errors: outcome.errors,
                    }
                }
            }
        } else {
            match self.store.save(&outcome.feed).await {
                Ok(entry) => {
                    info!(
                        target: "feed",
                        run,
                        articles = entry.feed.articles.len(),
                        failed_sources = outcome.errors.len(),
                        backend = self.store.backend(),
                        "feed cached"
                    );
                    gauge!("feed_last_refresh_ts").set(entry.stored_at.timestamp() as f64);
                    state.last_good = Some(entry.clone());
                    ServedFeed::from_entry(entry, FeedStatus::Refreshed, outcome.errors)
                }
                Err(e) => {
                    error!(target: "feed", run, backend = self.store.backend(), error = %e, "cache save failed; serving unsaved feed");
                    ServedFeed {
                        feed: outcome.feed,
                        status: FeedStatus::Refreshed,
                        stored_at: None,
                        errors: outcome.errors,
                    }
                }
            }
        };

        state.last = Some(served.clone());
        self.completed.fetch_add(1, Ordering::AcqRel);
        served
    }
}
