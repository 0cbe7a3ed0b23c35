// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics, CACHE_ENTRIES, CACHE_OPERATIONS, CLASSIFIER_CALLS, CLASSIFIER_DURATION,
};

/// Helpers to record response cache operations
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_eviction() {
    CACHE_OPERATIONS.with_label_values(&["eviction"]).inc();
}

pub fn record_cache_expired(count: usize) {
    CACHE_OPERATIONS
        .with_label_values(&["expired"])
        .inc_by(count as f64);
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.set(count as f64);
}

/// Helper to record an upstream classifier call
pub fn record_classifier_call(model: &str, success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "failure" };
    CLASSIFIER_CALLS.with_label_values(&[model, outcome]).inc();
    CLASSIFIER_DURATION
        .with_label_values(&[model])
        .observe(duration_secs);
}
