// HTTP routes exercised end-to-end with a mock classifier upstream
// Author: kelexine (https://github.com/kelexine)

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use classify_cache::cache::{compute_key, CacheConfig, ManualClock, ResponseCache};
use classify_cache::classifier::LlmClassifier;
use classify_cache::config::{AppConfig, ClassifierConfig};
use classify_cache::server::{create_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app(base_url: &str, debug: bool) -> (Router, Arc<ResponseCache>) {
    let cache = Arc::new(ResponseCache::new(CacheConfig::default()).unwrap());
    app_with_cache(base_url, debug, cache)
}

fn app_with_cache(base_url: &str, debug: bool, cache: Arc<ResponseCache>) -> (Router, Arc<ResponseCache>) {
    let config = AppConfig {
        debug,
        classifier: ClassifierConfig {
            api_base_url: base_url.to_string(),
            api_key: "sk-test-0123456789".to_string(),
            max_attempts: 1,
            ..ClassifierConfig::default()
        },
        ..AppConfig::default()
    };
    let classifier = LlmClassifier::new(&config.classifier).unwrap();

    let state = AppState {
        config: Arc::new(config),
        cache: cache.clone(),
        classifier: Arc::new(classifier),
        taxonomy: Arc::new(json!({"Littérature": ["Roman", "Poésie", "Théâtre"]})),
    };
    (create_router(state), cache)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn classify_request(text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/classify")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": text }).to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_classify_is_cached_between_requests() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": "{\"Description\": \"Pièces de théâtre\"}"}}]})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let (app, cache) = app(&server.url(), false);

    let (status, first) = send(&app, classify_request("théâtre classique")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["result"]["Description"], "Pièces de théâtre");
    assert_eq!(first["cache_key"].as_str().unwrap().len(), 64);

    let (_, second) = send(&app, classify_request("Théâtre   classique")).await;
    assert_eq!(second["cache_key"], first["cache_key"]);
    assert_eq!(cache.get_stats(false).hits, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_text_rejected() {
    let (app, cache) = app("http://127.0.0.1:9", false);
    let (status, body) = send(&app, classify_request("   ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(cache.get_stats(false).misses, 0);
}

#[tokio::test]
async fn test_upstream_failure_maps_to_bad_gateway() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_body(r#"{"error": {"message": "context too long"}}"#)
        .create_async()
        .await;
    let (app, cache) = app(&server.url(), false);

    let (status, body) = send(&app, classify_request("romans")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]["message"].as_str().unwrap().contains("context too long"));
    assert!(cache.is_empty());
}

/// Cache holding one entry that has already outlived its TTL.
fn cache_with_expired_entry() -> Arc<ResponseCache> {
    let clock = Arc::new(ManualClock::new());
    let cache = ResponseCache::with_clock(
        CacheConfig {
            capacity: 8,
            ttl: Duration::from_secs(60),
        },
        clock.clone(),
    )
    .unwrap();
    cache.set(compute_key("romans", &json!({})), json!({"Description": "Romans"}));
    clock.advance(Duration::from_secs(61));
    Arc::new(cache)
}

#[tokio::test]
async fn test_stats_mode_follows_debug_flag() {
    // Production sweeps expired entries by default
    let (prod, _) = app_with_cache("http://127.0.0.1:9", false, cache_with_expired_entry());
    let (status, body) = send(&prod, empty_request("GET", "/cache/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["swept"], 1);
    assert_eq!(body["entries"], 0);
    assert_eq!(body["expired_removals"], 1);

    // Debug takes the fast path and leaves the entry in place
    let (debug, _) = app_with_cache("http://127.0.0.1:9", true, cache_with_expired_entry());
    let (status, body) = send(&debug, empty_request("GET", "/cache/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["swept"], 0);
    assert_eq!(body["entries"], 1);
    assert_eq!(body["capacity"], 8);
    assert_eq!(body["ttl_ms"], 60_000);
}

#[tokio::test]
async fn test_stats_cleanup_query_overrides_default() {
    let (prod, _) = app_with_cache("http://127.0.0.1:9", false, cache_with_expired_entry());
    let (_, body) = send(&prod, empty_request("GET", "/cache/stats?cleanup=false")).await;
    assert_eq!(body["swept"], 0);
    assert_eq!(body["entries"], 1);

    let (debug, _) = app_with_cache("http://127.0.0.1:9", true, cache_with_expired_entry());
    let (_, body) = send(&debug, empty_request("GET", "/cache/stats?cleanup=true")).await;
    assert_eq!(body["swept"], 1);
    assert_eq!(body["entries"], 0);
}

#[tokio::test]
async fn test_clear_and_reset_endpoints() {
    let (app, cache) = app("http://127.0.0.1:9", false);
    let key = compute_key("romans", &json!({}));
    cache.set(key.clone(), json!({"Description": "Romans"}));
    let _ = cache.get(&key);

    let (status, body) = send(&app, empty_request("POST", "/cache/clear")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"], 0);
    assert_eq!(body["hits"], 1);

    let (_, body) = send(&app, empty_request("POST", "/cache/reset-stats")).await;
    assert_eq!(body["hits"], 0);
    assert_eq!(body["misses"], 0);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (app, _) = app("http://127.0.0.1:9", false);

    let (status, body) = send(&app, empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cache"]["entries"], 0);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/metrics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
