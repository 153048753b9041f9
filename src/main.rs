//! Tech News API — binary entrypoint.
//! Wires config, cache store, source fetchers, the refresh coordinator and the
//! background timer, then serves the Axum router under Shuttle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tech_news_api::api::{self, AppState};
use tech_news_api::config::feed::FeedConfig;
use tech_news_api::ingest::config::load_sources_default;
use tech_news_api::ingest::providers::{pages::HttpPages, sites};
use tech_news_api::ingest::scheduler::RefreshScheduler;
use tech_news_api::metrics::Metrics;
use tech_news_api::refresh::RefreshCoordinator;

/// Compact logs; `RUST_LOG` overrides the default filter. Leaves an already
/// installed subscriber in place.
fn enable_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tech_news_api=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// HTTP server plus the refresh timer, started and stopped together.
struct FeedService {
    router: Router,
    coordinator: Arc<RefreshCoordinator>,
    refresh_interval: Duration,
}

#[async_trait::async_trait]
impl shuttle_runtime::Service for FeedService {
    async fn bind(self, addr: SocketAddr) -> Result<(), shuttle_runtime::Error> {
        let scheduler = RefreshScheduler::start(self.coordinator, self.refresh_interval);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "tech news api listening");
        let served = axum::serve(listener, self.router).await;

        scheduler.stop().await;
        served?;
        Ok(())
    }
}

#[shuttle_runtime::main]
async fn main() -> Result<FeedService, shuttle_runtime::Error> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    enable_tracing();

    let cfg = FeedConfig::from_env()?;
    let sources = load_sources_default()?;
    tracing::info!(
        ttl_secs = cfg.ttl_secs,
        refresh_interval_secs = cfg.refresh_interval_secs,
        backend = ?cfg.backend,
        sources = ?sources,
        "feed config loaded"
    );

    let store = cfg.build_store()?;
    let pages = Arc::new(HttpPages::new(Duration::from_secs(10))?);
    let fetchers = sites::build_fetchers(&sources, pages, cfg.pacing())?;

    let coordinator = Arc::new(
        RefreshCoordinator::new(store, fetchers, cfg.policy()).with_fetch_timeout(cfg.fetch_timeout()),
    );

    let metrics = Metrics::init(cfg.ttl_secs)?;
    let router = api::router(AppState::new(coordinator.clone())).merge(metrics.router());

    Ok(FeedService {
        router,
        coordinator,
        refresh_interval: cfg.refresh_interval(),
    })
}
