use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::error::SourceError;
use crate::ingest::types::Article;
use crate::refresh::{FeedStatus, RefreshCoordinator};

pub const CACHE_HEADER: &str = "X-Feed-Cache";

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<RefreshCoordinator>,
}

impl AppState {
    pub fn new(feed: Arc<RefreshCoordinator>) -> Self {
        Self { feed }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/news", get(news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct RootResp {
    message: &'static str,
}

async fn root() -> Json<RootResp> {
    Json(RootResp {
        message: "Tech News API is running",
    })
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct NewsResp {
    articles: Vec<Article>,
    generated_at: DateTime<Utc>,
    stored_at: Option<DateTime<Utc>>,
    status: FeedStatus,
    errors: Vec<SourceError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Pass-through to the coordinator; the stale/unavailable decision is made there.
async fn news(State(state): State<AppState>) -> Response {
    let served = state.feed.get_feed().await;

    let (code, error) = match served.status {
        FeedStatus::Unavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Some("no feed available yet: every source failed and nothing is cached".to_string()),
        ),
        _ => (StatusCode::OK, None),
    };

    let body = NewsResp {
        articles: served.feed.articles,
        generated_at: served.feed.generated_at,
        stored_at: served.stored_at,
        status: served.status,
        errors: served.errors,
        error,
    };
    (code, [(CACHE_HEADER, served.status.cache_header())], Json(body)).into_response()
}
