//! Axum-based HTTP surface around the response cache.
//!
//! The web layer is a leaf caller of the cache: it classifies queries through
//! `ResponseCache::get_or_compute`, exposes statistics for monitoring and
//! offers administrative clearing.
//!
//! # Components
//!
//! - `handlers`: Endpoint implementations (classify, health, cache admin, metrics).
//! - `routes`: Router configuration, request ID layers and shared `AppState`.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod routes;

pub use handlers::{ClassifyRequest, ClassifyResponse, HealthResponse, StatsQuery};
pub use routes::{create_router, AppState};
