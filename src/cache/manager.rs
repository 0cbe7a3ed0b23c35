// Response cache - bounded LRU with TTL expiry in front of the classifier
// Author: kelexine (https://github.com/kelexine)

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::key::{compute_key, CacheKey};
use crate::cache::models::{hit_rate, CacheConfig, CacheStats};
use crate::error::CacheError;
use crate::metrics;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    /// `None` when `created_at + ttl` does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Counters readable without the entry lock.
///
/// Only written while the entry lock is held, so writers never race each
/// other; readers on the fast stats path may observe fields from slightly
/// different moments.
#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
    entries: AtomicUsize,
}

/// Thread-safe TTL/LRU cache for classifier responses.
///
/// All mutations serialize on a single mutex around the LRU table.
/// `get_stats(false)` reads atomic counters only and never waits on it.
pub struct ResponseCache<V = Value> {
    entries: Mutex<LruCache<CacheKey, CacheEntry<V>>>,
    counters: Counters,
    capacity: NonZeroUsize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache driven by the system clock.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(config.capacity)
            .ok_or_else(|| CacheError::InvalidConfig("capacity must be greater than 0".into()))?;
        if config.ttl.is_zero() {
            return Err(CacheError::InvalidConfig("ttl must be greater than 0".into()));
        }

        info!(
            "Initializing response cache: capacity={}, ttl={:?}",
            capacity, config.ttl
        );

        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            counters: Counters::default(),
            capacity,
            ttl: config.ttl,
            clock,
        })
    }

    /// Look up a live entry, promoting it to most-recently-used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired = match entries.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.record_miss();
                debug!("Cache miss for key: {}", key.short());
                return None;
            }
        };

        if expired {
            if let Some(entry) = entries.pop(key) {
                debug!(
                    "Cache entry expired after {}ms: {}",
                    now.saturating_duration_since(entry.created_at).as_millis(),
                    key.short()
                );
            }
            self.counters.entries.store(entries.len(), Ordering::Relaxed);
            self.counters.expired.fetch_add(1, Ordering::Relaxed);
            self.record_miss();
            metrics::record_cache_expired(1);
            metrics::update_cache_entries(entries.len());
            return None;
        }

        let value = entries.get(key).map(|entry| entry.value.clone());
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_hit();
        debug!("Cache hit: {}", key.short());
        value
    }

    /// Insert or overwrite `key`, making it most-recently-used.
    ///
    /// A new key arriving at capacity evicts exactly one least-recently-used
    /// entry. Overwriting an existing key never evicts.
    pub fn set(&self, key: CacheKey, value: V) {
        let now = self.clock.now();
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: now.checked_add(self.ttl),
        };

        let mut entries = self.entries.lock();
        if !entries.contains(&key) && entries.len() >= self.capacity.get() {
            if let Some((victim, _)) = entries.pop_lru() {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_eviction();
                debug!("Evicted LRU cache entry: {}", victim.short());
            }
        }
        entries.put(key, entry);
        self.counters.entries.store(entries.len(), Ordering::Relaxed);
        metrics::update_cache_entries(entries.len());
    }

    /// Return the cached result for `(text, context)` or compute and store it.
    ///
    /// The lock is released while `classify` runs, so two concurrent misses on
    /// the same key may both call it; the later `set` wins. An `Err` from
    /// `classify` is returned untouched and nothing is stored.
    pub async fn get_or_compute<'a, F, Fut, E>(
        &self,
        text: &'a str,
        context: &'a Value,
        classify: F,
    ) -> Result<V, E>
    where
        F: FnOnce(&'a str, &'a Value) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = compute_key(text, context);
        self.get_or_compute_keyed(key, text, context, classify).await
    }

    /// Same as [`get_or_compute`](Self::get_or_compute) for a caller that
    /// already holds the key of `(text, context)`.
    pub async fn get_or_compute_keyed<'a, F, Fut, E>(
        &self,
        key: CacheKey,
        text: &'a str,
        context: &'a Value,
        classify: F,
    ) -> Result<V, E>
    where
        F: FnOnce(&'a str, &'a Value) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = classify(text, context).await.inspect_err(|_| {
            debug!("Classifier failed, nothing cached for key: {}", key.short());
        })?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Blocking counterpart of [`get_or_compute`](Self::get_or_compute).
    pub fn get_or_compute_with<F, E>(&self, text: &str, context: &Value, classify: F) -> Result<V, E>
    where
        F: FnOnce(&str, &Value) -> Result<V, E>,
    {
        let key = compute_key(text, context);
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = classify(text, context).inspect_err(|_| {
            debug!("Classifier failed, nothing cached for key: {}", key.short());
        })?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Snapshot of the counters.
    ///
    /// With `cleanup_expired` the table is locked and every expired entry is
    /// removed first. Without it no lock is taken and `entries` is the raw
    /// stored count.
    pub fn get_stats(&self, cleanup_expired: bool) -> CacheStats {
        let swept = if cleanup_expired {
            self.sweep_expired()
        } else {
            0
        };
        self.snapshot(swept)
    }

    /// Remove every entry. Counters are kept.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        self.counters.entries.store(0, Ordering::Relaxed);
        metrics::update_cache_entries(0);
        info!("Cache cleared ({} entries removed)", removed);
    }

    /// Zero hit, miss, eviction and expiry counters without touching entries.
    pub fn reset_statistics(&self) {
        let _entries = self.entries.lock();
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.evictions.store(0, Ordering::Relaxed);
        self.counters.expired.store(0, Ordering::Relaxed);
        debug!("Cache statistics reset");
    }

    /// Stored entries, including expired ones not yet detected.
    pub fn len(&self) -> usize {
        self.counters.entries.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }

        let removed = expired.len();
        if removed > 0 {
            self.counters
                .expired
                .fetch_add(removed as u64, Ordering::Relaxed);
            self.counters.entries.store(entries.len(), Ordering::Relaxed);
            metrics::record_cache_expired(removed);
            metrics::update_cache_entries(entries.len());
            debug!("Swept {} expired cache entries", removed);
        }
        removed
    }

    fn snapshot(&self, swept: usize) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expired_removals: self.counters.expired.load(Ordering::Relaxed),
            entries: self.counters.entries.load(Ordering::Relaxed),
            capacity: self.capacity.get(),
            ttl_ms: u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX),
            hit_rate: hit_rate(hits, misses),
            swept,
        }
    }

    fn record_miss(&self) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_miss();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use serde_json::json;

    fn cache_with_clock(capacity: usize, ttl_secs: u64) -> (ResponseCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(
            CacheConfig {
                capacity,
                ttl: Duration::from_secs(ttl_secs),
            },
            clock.clone(),
        )
        .unwrap();
        (cache, clock)
    }

    fn key(name: &str) -> CacheKey {
        compute_key(name, &Value::Null)
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = ResponseCache::<String>::new(CacheConfig {
            capacity: 0,
            ttl: Duration::from_secs(1),
        });
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let result = ResponseCache::<String>::new(CacheConfig {
            capacity: 1,
            ttl: Duration::ZERO,
        });
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_get_miss_then_hit() {
        let (cache, _) = cache_with_clock(4, 60);
        assert_eq!(cache.get(&key("a")), None);

        cache.set(key("a"), "A".into());
        assert_eq!(cache.get(&key("a")), Some("A".to_string()));

        let stats = cache.get_stats(false);
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_expired_exactly_at_ttl() {
        let (cache, clock) = cache_with_clock(4, 10);
        cache.set(key("a"), "A".into());

        clock.advance(Duration::from_secs(9));
        assert!(cache.get(&key("a")).is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.get_stats(false).expired_removals, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_refreshes_expiry() {
        let (cache, clock) = cache_with_clock(4, 10);
        cache.set(key("a"), "A".into());
        clock.advance(Duration::from_secs(8));
        cache.set(key("a"), "A2".into());
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get(&key("a")), Some("A2".to_string()));
    }

    #[test]
    fn test_eviction_counts_once_per_overflow() {
        let (cache, _) = cache_with_clock(2, 60);
        for name in ["a", "b", "c", "d"] {
            cache.set(key(name), name.to_string());
        }
        let stats = cache.get_stats(false);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.entries, 2);
        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("d")).is_some());
    }

    #[test]
    fn test_sweep_reports_swept_count() {
        let (cache, clock) = cache_with_clock(8, 5);
        cache.set(key("old1"), "1".into());
        cache.set(key("old2"), "2".into());
        clock.advance(Duration::from_secs(3));
        cache.set(key("fresh"), "3".into());
        clock.advance(Duration::from_secs(3));

        let stats = cache.get_stats(true);
        assert_eq!(stats.swept, 2);
        assert_eq!(stats.expired_removals, 2);
        assert_eq!(stats.entries, 1);

        let again = cache.get_stats(true);
        assert_eq!(again.swept, 0);
        assert_eq!(again.expired_removals, 2);
    }

    #[test]
    fn test_reset_statistics_keeps_entries() {
        let (cache, _) = cache_with_clock(4, 60);
        cache.set(key("a"), "A".into());
        let _ = cache.get(&key("a"));
        let _ = cache.get(&key("b"));

        cache.reset_statistics();
        let stats = cache.get_stats(false);
        assert_eq!(stats.hits + stats.misses + stats.evictions + stats.expired_removals, 0);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(cache.get(&key("a")), Some("A".to_string()));
    }

    #[test]
    fn test_compute_closure_may_use_cache() {
        let (cache, _) = cache_with_clock(4, 60);
        let ctx = json!({"Sciences": []});

        // Would deadlock if the lock were held while computing.
        let result: Result<String, ()> = cache.get_or_compute_with("optique", &ctx, |_, _| {
            cache.set(key("side"), "S".into());
            Ok(format!("len={}", cache.get_stats(true).entries))
        });

        assert_eq!(result, Ok("len=1".to_string()));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_get_or_compute_async_hit_skips_classifier() {
        let (cache, _) = cache_with_clock(4, 60);
        let ctx = json!({});
        let mut calls = 0;

        let first: Result<String, String> = cache
            .get_or_compute("polar", &ctx, |t, _| {
                calls += 1;
                let out = t.to_uppercase();
                async move { Ok(out) }
            })
            .await;
        assert_eq!(first.unwrap(), "POLAR");

        let second: Result<String, String> = cache
            .get_or_compute("  Polar ", &ctx, |_, _| async { Err("must not run".to_string()) })
            .await;
        assert_eq!(second.unwrap(), "POLAR");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_keyed_uses_given_key() {
        let (cache, _) = cache_with_clock(4, 60);
        let ctx = json!({"Polar": []});
        let k = compute_key("roman noir", &ctx);

        let first: Result<String, String> = cache
            .get_or_compute_keyed(k.clone(), "roman noir", &ctx, |_, _| async { Ok("N".to_string()) })
            .await;
        assert_eq!(first.unwrap(), "N");
        assert_eq!(cache.get(&k), Some("N".to_string()));

        // Same entry through the unkeyed path
        let second: Result<String, String> = cache
            .get_or_compute("Roman  Noir", &ctx, |_, _| async { Err("must not run".to_string()) })
            .await;
        assert_eq!(second.unwrap(), "N");
    }

    #[test]
    fn test_stats_report_sub_second_ttl() {
        let cache: ResponseCache<String> = ResponseCache::new(CacheConfig {
            capacity: 2,
            ttl: Duration::from_millis(250),
        })
        .unwrap();
        assert_eq!(cache.get_stats(false).ttl_ms, 250);
    }
}
