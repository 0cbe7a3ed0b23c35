// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::cache::{compute_key, CacheKey, CacheStats};
use crate::error::{AppError, Result};
use crate::metrics::gather_metrics;
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub cache: CacheStats,
    pub timestamp: String,
}

/// Health never sweeps: it must answer quickly whatever the cache size.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        cache: state.cache.get_stats(false),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    /// Taxonomy context; the configured default is used when absent.
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub cache_key: String,
    pub result: Value,
}

/// Handler for /classify - classification through the response cache
pub async fn classify_handler(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>> {
    if req.text.trim().is_empty() {
        return Err(AppError::InvalidRequest("text must not be empty".to_string()));
    }

    let context = req
        .context
        .unwrap_or_else(|| state.taxonomy.as_ref().clone());
    let key: CacheKey = compute_key(&req.text, &context);
    debug!("Classify request for key {}", key.short());

    let classifier = state.classifier.as_ref();
    let result = state
        .cache
        .get_or_compute_keyed(key.clone(), &req.text, &context, |text, ctx| {
            classifier.classify(text, ctx)
        })
        .await?;

    Ok(Json(ClassifyResponse {
        cache_key: key.to_string(),
        result,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Sweep expired entries before reporting. Defaults to `!debug`.
    pub cleanup: Option<bool>,
}

/// Handler for /cache/stats
pub async fn stats_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Json<CacheStats> {
    let cleanup = query.cleanup.unwrap_or(!state.config.debug);
    Json(state.cache.get_stats(cleanup))
}

/// Handler for /cache/clear - drops every entry, counters survive
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<CacheStats> {
    state.cache.clear();
    info!("Response cache cleared via admin endpoint");
    Json(state.cache.get_stats(false))
}

/// Handler for /cache/reset-stats
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    state.cache.reset_statistics();
    info!("Response cache statistics reset via admin endpoint");
    Json(state.cache.get_stats(false))
}

/// Handler for /metrics - Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
