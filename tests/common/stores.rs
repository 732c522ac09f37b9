//! Backing stores with controllable failure behavior

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tradeguard_core::cache::{BackingStore, CacheError, CacheResult, MemoryBackingStore};

/// Distributed-looking store whose every call fails with a connection error
#[derive(Debug, Default)]
pub struct FailingStore {
    calls: AtomicU64,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> CacheResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }
}

impl BackingStore for FailingStore {
    fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        self.fail()
    }

    fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        self.fail()
    }

    fn delete(&self, _key: &str) -> CacheResult<()> {
        self.fail()
    }

    fn clear(&self) -> CacheResult<()> {
        self.fail()
    }

    fn delete_pattern(&self, _prefix: &str) -> CacheResult<u64> {
        self.fail()
    }

    fn health_check(&self) -> CacheResult<bool> {
        self.fail()
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}

/// Distributed-looking in-memory store that can be taken down and brought back
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryBackingStore,
    down: AtomicBool,
    calls: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackingStore::new(1000),
            down: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn come_back(&self) {
        self.down.store(false, Ordering::SeqCst);
    }

    /// Calls that reached the store, successful or not
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            Err(CacheError::ConnectionError("timed out".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingStore for FlakyStore {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check()?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.check()?;
        self.inner.set(key, value, ttl)
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.inner.delete(key)
    }

    fn clear(&self) -> CacheResult<()> {
        self.check()?;
        self.inner.clear()
    }

    fn delete_pattern(&self, prefix: &str) -> CacheResult<u64> {
        self.check()?;
        self.inner.delete_pattern(prefix)
    }

    fn health_check(&self) -> CacheResult<bool> {
        self.check()?;
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "flaky"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}
