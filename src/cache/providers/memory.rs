//! In-process backing store
//!
//! Local stand-in for the shared store when Redis is not configured or not
//! reachable at startup. Supports per-entry TTL and prefix deletion.
//!
//! **Important**: this store is NOT distributed. Each process keeps its own
//! state, so invalidations do not propagate across replicas.

use crate::cache::entry::TimedEntry;
use crate::cache::errors::CacheResult;
use crate::cache::traits::BackingStore;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// In-memory backing store built on `DashMap`
#[derive(Debug)]
pub struct MemoryBackingStore {
    entries: DashMap<String, TimedEntry<String>>,
    max_entries: usize,
}

impl MemoryBackingStore {
    /// Create a store bounded to `max_entries` (minimum 1)
    pub fn new(max_entries: usize) -> Self {
        debug!(max_entries = max_entries, "Memory backing store created");
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Make room for one insert: drop expired entries first, then the entry
    /// closest to expiry.
    fn make_room(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));

        while self.entries.len() >= self.max_entries {
            let victim = self
                .entries
                .iter()
                .min_by_key(|item| item.value().expires_at())
                .map(|item| item.key().clone());

            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl BackingStore for MemoryBackingStore {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let value = match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => Some(entry.value().value().clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if value.is_none() {
            self.entries
                .remove_if(key, |_, entry| entry.is_expired_at(now));
        }
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.make_room();
        }
        self.entries
            .insert(key.to_string(), TimedEntry::new(value.to_string(), ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    fn delete_pattern(&self, prefix: &str) -> CacheResult<u64> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let deleted = before.saturating_sub(self.entries.len()) as u64;

        debug!(prefix = prefix, deleted = deleted, "Memory store prefix DEL");
        Ok(deleted)
    }

    fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
