// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /          (liveness message)
// - GET /health
// - GET /news      (body shape, X-Feed-Cache header, 503 when unavailable)
// - CORS for arbitrary origins

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use common::{article, dyn_fetchers, MockFetcher};
use tech_news_api::api::{self, AppState, CACHE_HEADER};
use tech_news_api::cache::{CacheEntry, MemoryCacheStore};
use tech_news_api::freshness::FreshnessPolicy;
use tech_news_api::{Feed, RefreshCoordinator};

const BODY_LIMIT: usize = 1024 * 1024;

fn app_with(store: MemoryCacheStore, fetchers: &[Arc<MockFetcher>]) -> Router {
    let coordinator = RefreshCoordinator::new(
        Arc::new(store),
        dyn_fetchers(fetchers),
        FreshnessPolicy::from_secs(1800),
    )
    .with_fetch_timeout(Duration::from_secs(5));
    api::router(AppState::new(Arc::new(coordinator)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn root_reports_liveness() {
    let app = app_with(MemoryCacheStore::new(), &[]);
    let resp = app.oneshot(get("/")).await.expect("oneshot /");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["message"], "Tech News API is running");
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app_with(MemoryCacheStore::new(), &[]);
    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn news_miss_refreshes_and_returns_articles() {
    let app = app_with(
        MemoryCacheStore::new(),
        &[MockFetcher::ok("A", 2), MockFetcher::failing("B", "refused")],
    );

    let resp = app.oneshot(get("/news")).await.expect("oneshot /news");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CACHE_HEADER], "MISS");

    let body = json_body(resp).await;
    assert_eq!(body["status"], "refreshed");
    let articles = body["articles"].as_array().expect("articles array");
    assert_eq!(articles.len(), 2);
    for key in ["source", "title", "link", "content", "image", "fetchedAt"] {
        assert!(articles[0].get(key).is_some(), "article missing {key}");
    }
    assert!(body["generatedAt"].is_string());
    assert!(body["storedAt"].is_string());
    assert_eq!(body["errors"][0]["source"], "B");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn news_hit_serves_cache_without_fetching() {
    let now = Utc::now();
    let store = MemoryCacheStore::seeded(CacheEntry {
        feed: Feed {
            articles: vec![article("Cached", 0)],
            generated_at: now,
        },
        stored_at: now,
    });
    let fetcher = MockFetcher::ok("A", 3);
    let app = app_with(store, &[fetcher.clone()]);

    let resp = app.oneshot(get("/news")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CACHE_HEADER], "HIT");
    let body = json_body(resp).await;
    assert_eq!(body["status"], "fresh");
    assert_eq!(body["articles"][0]["source"], "Cached");
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn news_all_failed_with_stale_cache_serves_stale() {
    let old = Utc::now() - chrono::Duration::hours(3);
    let store = MemoryCacheStore::seeded(CacheEntry {
        feed: Feed {
            articles: vec![article("Cached", 0)],
            generated_at: old,
        },
        stored_at: old,
    });
    let app = app_with(store, &[MockFetcher::failing("A", "dns")]);

    let resp = app.oneshot(get("/news")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CACHE_HEADER], "STALE");
    let body = json_body(resp).await;
    assert_eq!(body["status"], "stale");
    assert_eq!(body["articles"][0]["source"], "Cached");
    assert_eq!(body["errors"][0]["source"], "A");
}

#[tokio::test]
async fn news_unavailable_is_503_with_empty_articles() {
    let app = app_with(MemoryCacheStore::new(), &[MockFetcher::failing("A", "dns")]);

    let resp = app.oneshot(get("/news")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.headers()[CACHE_HEADER], "MISS");
    let body = json_body(resp).await;
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["articles"], serde_json::json!([]));
    assert!(body["storedAt"].is_null());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let app = app_with(MemoryCacheStore::new(), &[MockFetcher::ok("A", 1)]);
    let req = Request::builder()
        .method("GET")
        .uri("/news")
        .header(header::ORIGIN, "https://frontend.example")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let allowed = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("CORS header present");
    assert_eq!(allowed, "https://frontend.example");
}
