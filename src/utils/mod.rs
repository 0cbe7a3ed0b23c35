//! Utility functions and helpers for classify-cache.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and secret redaction.
//! - `retry`: Retry with backoff for upstream classifier calls.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod retry;
