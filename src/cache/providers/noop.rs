//! No-op backing store
//!
//! Always misses, always succeeds. Selected when the L2 tier is disabled
//! (`backend = "none"`), leaving the service L1-only.

use crate::cache::errors::CacheResult;
use crate::cache::traits::BackingStore;
use std::time::Duration;

/// Backing store that never stores anything
#[derive(Debug, Clone, Default)]
pub struct NoOpBackingStore;

impl NoOpBackingStore {
    pub fn new() -> Self {
        Self
    }
}

impl BackingStore for NoOpBackingStore {
    fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        Ok(())
    }

    fn delete_pattern(&self, _prefix: &str) -> CacheResult<u64> {
        Ok(0)
    }

    fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}
