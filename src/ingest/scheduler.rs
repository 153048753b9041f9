// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::refresh::RefreshCoordinator;

/// Periodic background refresh. The first tick fires immediately, which warms
/// the cache at startup.
pub struct RefreshScheduler {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawn the timer. `interval == 0` keeps the task idle until `stop`.
    pub fn start(coordinator: Arc<RefreshCoordinator>, interval: Duration) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(run(coordinator, interval, rx));
        Self { shutdown, task }
    }

    /// Signal the loop and wait for it. An in-flight refresh finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(target: "ingest", error = %e, "refresh scheduler ended abnormally");
        }
    }
}

async fn run(
    coordinator: Arc<RefreshCoordinator>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    if interval.is_zero() {
        tracing::info!(target: "ingest", "background refresh disabled (REFRESH_INTERVAL = 0)");
        let _ = shutdown.wait_for(|stop| *stop).await;
        return;
    }

    tracing::info!(target: "ingest", interval_secs = interval.as_secs(), "refresh scheduler started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // The watch::Ref guard is not Send; release it inside the branch.
            _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                tracing::info!(target: "ingest", "refresh scheduler stopping");
                break;
            }
            _ = ticker.tick() => {
                match coordinator.trigger_background_refresh().await {
                    Some(served) => tracing::info!(
                        target: "ingest",
                        status = ?served.status,
                        articles = served.feed.articles.len(),
                        failed_sources = served.errors.len(),
                        "background refresh tick"
                    ),
                    None => tracing::debug!(target: "ingest", "background tick skipped"),
                }
            }
        }
    }
}
