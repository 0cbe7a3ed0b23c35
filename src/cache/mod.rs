//! Response cache for the classifier.
//!
//! A bounded, TTL-aware LRU cache keyed by a SHA-256 fingerprint of the
//! normalized query text and its taxonomy context. The cache is built once by
//! the composition root and shared behind an `Arc`.
//!
//! # Submodules
//!
//! - `clock`: time source abstraction so expiry can be driven by tests.
//! - `key`: fingerprint computation and the `CacheKey` newtype.
//! - `manager`: the `ResponseCache` itself.
//! - `models`: configuration and statistics snapshot types.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod clock;
pub mod key;
pub mod manager;
pub mod models;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{compute_key, CacheKey};
pub use manager::ResponseCache;
pub use models::{CacheConfig, CacheStats};
