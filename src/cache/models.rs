//! Cache configuration and statistics models.

// Author: kelexine (https://github.com/kelexine)

use serde::Serialize;
use std::time::Duration;

/// Configuration for the response cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of stored entries.
    pub capacity: usize,
    /// Lifetime of an entry, measured from its last `set`.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    /// Provides default values for cache configuration.
    ///
    /// - `capacity`: 500
    /// - `ttl`: 1 hour
    fn default() -> Self {
        Self {
            capacity: 500,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Point-in-time view of cache counters.
///
/// Counters are lifetime values of the cache instance; `clear` keeps them and
/// only `reset_statistics` zeroes them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing or only an expired entry.
    pub misses: u64,
    /// Entries dropped to make room for a new key.
    pub evictions: u64,
    /// Expired entries removed, either lazily by `get` or by a sweep.
    pub expired_removals: u64,
    /// Stored entries. On the fast path this may include expired entries not yet detected.
    pub entries: usize,
    pub capacity: usize,
    /// Entry lifetime in milliseconds, so sub-second TTLs stay visible.
    pub ttl_ms: u64,
    /// `hits / (hits + misses)`, 0.0 before the first access.
    pub hit_rate: f64,
    /// Expired entries removed by the call that produced this snapshot.
    pub swept: usize,
}

impl CacheStats {
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate_percent(&self) -> f64 {
        self.hit_rate * 100.0
    }
}

pub(crate) fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
