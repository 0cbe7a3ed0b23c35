// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    classify_handler, clear_cache_handler, health_handler, metrics_handler,
    reset_stats_handler, stats_handler,
};
use crate::cache::ResponseCache;
use crate::classifier::LlmClassifier;
use crate::config::AppConfig;
use axum::{
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<ResponseCache>,
    pub classifier: Arc<LlmClassifier>,
    /// Context used when a request does not carry its own.
    pub taxonomy: Arc<Value>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/classify", post(classify_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/clear", post(clear_cache_handler))
        .route("/cache/reset-stats", post(reset_stats_handler))
        .route("/metrics", get(metrics_handler))
        // Taxonomies are small; 1MB covers query plus inline context.
        .layer(tower_http::limit::RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
