//! Backing store trait definition

use super::errors::CacheResult;
use std::fmt::Debug;
use std::time::Duration;

/// Shared key-value store used as the L2 cache tier
///
/// Implemented by the Redis store (shared across replicas), the in-process
/// memory store (local fallback) and the no-op store. Calls are synchronous;
/// implementations bound their own network I/O with timeouts.
pub trait BackingStore: Send + Sync + Debug {
    /// Get a value from the store by key
    ///
    /// Returns `Ok(Some(value))` on hit, `Ok(None)` on miss.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a value with a TTL
    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete a specific key
    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Delete every key owned by this store
    fn clear(&self) -> CacheResult<()>;

    /// Delete all keys starting with `prefix`; returns the number deleted
    fn delete_pattern(&self, prefix: &str) -> CacheResult<u64>;

    /// Reachability probe
    fn health_check(&self) -> CacheResult<bool>;

    /// Name of the store implementation
    fn provider_name(&self) -> &'static str;

    /// Whether state is shared across processes (and involves network calls)
    fn is_distributed(&self) -> bool {
        false
    }
}
