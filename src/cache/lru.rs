//! In-process LRU cache (L1)
//!
//! A fixed-capacity, thread-safe cache of [`TimedEntry`] values. Eviction is
//! strict least-recently-used by access order: both `get` and `set` count as
//! an access. Expired entries are dropped lazily on `get` and proactively by
//! [`LruCache::cleanup_expired`].
//!
//! # Thread Safety
//!
//! All state (ordering map and counters) sits behind one `parking_lot::Mutex`,
//! so `get`/`set`/`delete` are linearizable relative to each other. The lock is
//! held only for in-memory bookkeeping.

use super::entry::TimedEntry;
use crate::config::ConfigurationError;
use linked_hash_map::LinkedHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::trace;

/// Snapshot of cache counters
///
/// `hits`, `misses`, `evictions` and `expirations` only ever increase for the
/// lifetime of the cache; `clear()` does not reset them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub max_size: usize,
    /// `hits / (hits + misses)`, 0.0 before the first lookup
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }
}

#[derive(Debug)]
struct LruInner<V> {
    entries: LinkedHashMap<String, TimedEntry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

/// Thread-safe, fixed-capacity LRU cache with per-entry TTL
#[derive(Debug)]
pub struct LruCache<V> {
    inner: Mutex<LruInner<V>>,
    max_size: usize,
}

impl<V: Clone> LruCache<V> {
    /// Create a cache holding at most `max_size` entries
    ///
    /// # Errors
    /// Returns `ConfigurationError::InvalidValue` when `max_size` is 0.
    pub fn new(max_size: usize) -> Result<Self, ConfigurationError> {
        if max_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "max_size",
                max_size,
                "LRU capacity must be at least 1",
            ));
        }

        Ok(Self {
            inner: Mutex::new(LruInner {
                entries: LinkedHashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            max_size,
        })
    }

    /// Get a value, marking it most-recently-used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        // get_refresh moves the entry to the back (most recently used)
        let lookup = inner.entries.get_refresh(key).map(|entry| {
            if entry.is_expired_at(now) {
                None
            } else {
                Some(entry.value().clone())
            }
        });

        match lookup {
            Some(Some(value)) => {
                inner.hits += 1;
                Some(value)
            }
            Some(None) => {
                inner.entries.remove(key);
                inner.misses += 1;
                inner.expirations += 1;
                trace!(key = key, "L1 entry expired on read");
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert or overwrite a value.
    ///
    /// Overwriting refreshes value, expiry, and LRU position. Inserting a new
    /// key at capacity evicts least-recently-used entries first, expired or not.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let entry = TimedEntry::new(value, ttl);
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.entries.remove(&key).is_none() {
            while inner.entries.len() >= self.max_size {
                match inner.entries.pop_front() {
                    Some((evicted, _)) => {
                        inner.evictions += 1;
                        trace!(key = %evicted, "L1 entry evicted (LRU)");
                    }
                    None => break,
                }
            }
        }

        inner.entries.insert(key, entry);
    }

    /// Remove a key; returns whether anything was removed
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    /// Remove all entries (counters are kept)
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Whether a live entry exists, without touching LRU order or counters
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Remove every logically expired entry; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.remove(key);
        }
        inner.expirations += expired.len() as u64;

        expired.len()
    }

    /// Physical entry count (may include not-yet-swept expired entries)
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.hits + inner.misses;
        let hit_rate = if total > 0 {
            inner.hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
            size: inner.entries.len(),
            max_size: self.max_size,
            hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(LruCache::<String>::new(0).is_err());
    }

    #[test]
    fn test_evicts_first_inserted_without_gets() {
        let cache = LruCache::new(2).unwrap();
        cache.set("A", 1, MINUTE);
        cache.set("B", 2, MINUTE);
        cache.set("C", 3, MINUTE);

        assert_eq!(cache.get("A"), None);
        assert_eq!(cache.get("B"), Some(2));
        assert_eq!(cache.get("C"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = LruCache::new(2).unwrap();
        cache.set("A", 1, MINUTE);
        cache.set("B", 2, MINUTE);
        assert_eq!(cache.get("A"), Some(1));

        cache.set("C", 3, MINUTE);

        assert_eq!(cache.get("B"), None);
        assert_eq!(cache.get("A"), Some(1));
        assert_eq!(cache.get("C"), Some(3));
    }

    #[test]
    fn test_overwrite_refreshes_value_and_position() {
        let cache = LruCache::new(2).unwrap();
        cache.set("A", 1, MINUTE);
        cache.set("B", 2, MINUTE);
        cache.set("A", 10, MINUTE);
        cache.set("C", 3, MINUTE);

        assert_eq!(cache.get("A"), Some(10));
        assert_eq!(cache.get("B"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let cache = LruCache::new(2).unwrap();
        cache.set("A", 1, MINUTE);
        cache.set("B", 2, MINUTE);
        cache.set("B", 3, MINUTE);

        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get("A"), Some(1));
    }

    #[test]
    fn test_capacity_is_hard_bound_even_for_fresh_entries() {
        let cache = LruCache::new(3).unwrap();
        for i in 0..10 {
            cache.set(format!("k{i}"), i, MINUTE);
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.stats().evictions, 7);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let cache = LruCache::new(4).unwrap();
        cache.set("quote", 1, Duration::from_millis(20));
        assert_eq!(cache.get("quote"), Some(1));

        thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get("quote"), None);
        assert_eq!(cache.len(), 0);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_cleanup_expired_only_removes_expired() {
        let cache = LruCache::new(10).unwrap();
        cache.set("short1", 1, Duration::from_millis(10));
        cache.set("short2", 2, Duration::from_millis(10));
        cache.set("long", 3, MINUTE);

        thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.cleanup_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("long"));
        assert_eq!(cache.cleanup_expired(), 0);
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = LruCache::new(4).unwrap();
        cache.set("a", 1, MINUTE);
        cache.set("b", 2, MINUTE);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hit_rate() {
        let cache = LruCache::new(4).unwrap();
        assert_eq!(cache.stats().hit_rate, 0.0);

        cache.set("a", 1, MINUTE);
        cache.get("a");
        cache.get("a");
        cache.get("a");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.total_requests(), 4);
        assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache = LruCache::new(1).unwrap();
        cache.set("a", 1, MINUTE);
        cache.set("b", 2, MINUTE);
        cache.get("b");
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_contains_does_not_touch_order_or_stats() {
        let cache = LruCache::new(2).unwrap();
        cache.set("A", 1, MINUTE);
        cache.set("B", 2, MINUTE);
        assert!(cache.contains("A"));

        cache.set("C", 3, MINUTE);

        assert!(!cache.contains("A"));
        assert_eq!(cache.stats().total_requests(), 0);
    }

    #[test]
    fn test_concurrent_access_respects_capacity() {
        let cache = Arc::new(LruCache::new(16).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("t{t}-k{}", i % 40);
                        cache.set(key.clone(), i, MINUTE);
                        cache.get(&key);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert!(stats.size <= 16);
        assert_eq!(stats.total_requests(), 8 * 500);
    }
}
