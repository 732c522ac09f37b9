//! Layered cache service
//!
//! Reads go L1 first, then the backing store (L2), back-filling L1 on an L2
//! hit. Writes go to L2 always and to L1 when the key's category allows it.
//! L1 lifetimes are capped at `l1_max_ttl` so a replica never serves a local
//! copy much older than the shared one.
//!
//! Backing store failures never reach the caller: they are logged, counted,
//! and treated as a miss or a skipped write. For distributed stores an
//! optional `cache_backend` circuit breaker skips L2 entirely while the store
//! is down, avoiding a timeout per request.

use super::errors::{CacheError, CacheResult};
use super::keys::{CacheKey, TtlPolicy};
use super::lru::{CacheStats, LruCache};
use super::provider::connect_graceful;
use super::traits::BackingStore;
use crate::config::{CacheConfig, ConfigResult, CACHE_BACKEND_COMPONENT};
use crate::resilience::{CircuitBreaker, CircuitBreakerRegistry, CircuitState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of a JSON read
#[derive(Debug, Clone, PartialEq)]
pub enum CachedJson<T> {
    /// Stored value decoded as `T`
    Decoded(T),
    /// Stored value did not decode as `T`; the raw string is returned as-is
    Raw(String),
}

impl<T> CachedJson<T> {
    pub fn decoded(self) -> Option<T> {
        match self {
            Self::Decoded(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

/// Backing store counters kept by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackingStoreStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls that returned an error (logged, never surfaced)
    pub errors: u64,
    /// Calls not attempted because the backend circuit was open
    pub skipped: u64,
}

/// Snapshot of both tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheServiceStats {
    pub l1: CacheStats,
    pub l2: BackingStoreStats,
    pub backend: String,
    pub backend_circuit_state: Option<CircuitState>,
}

#[derive(Debug, Default)]
struct L2Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    skipped: AtomicU64,
}

/// Two-tier cache: in-process LRU over a shared backing store
#[derive(Debug)]
pub struct CacheService {
    l1: LruCache<String>,
    backend: Arc<dyn BackingStore>,
    backend_breaker: Option<Arc<CircuitBreaker>>,
    ttl_policy: TtlPolicy,
    l1_max_ttl: Duration,
    l2: L2Counters,
}

impl CacheService {
    /// Build a service over an already-selected backing store
    ///
    /// When `registry` is given, the store is distributed, and
    /// `config.backend_circuit_breaker` is set, L2 calls go through the
    /// registry's `cache_backend` breaker.
    ///
    /// # Errors
    /// Returns a `ConfigurationError` for a zero L1 capacity, an unknown TTL
    /// override category, or invalid `cache_backend` breaker settings.
    pub fn new(
        config: &CacheConfig,
        backend: Arc<dyn BackingStore>,
        registry: Option<&CircuitBreakerRegistry>,
    ) -> ConfigResult<Self> {
        let l1 = LruCache::new(config.l1_max_size)?;
        let ttl_policy = TtlPolicy::new(config.parsed_ttl_overrides()?, config.default_ttl());

        let backend_breaker = if backend.is_distributed() && config.backend_circuit_breaker {
            registry
                .map(|r| r.get_or_create_default(CACHE_BACKEND_COMPONENT))
                .transpose()?
        } else {
            None
        };

        info!(
            backend = backend.provider_name(),
            l1_max_size = config.l1_max_size,
            l1_max_ttl_secs = config.l1_max_ttl_seconds,
            circuit_breaker = backend_breaker.is_some(),
            "Cache service initialized"
        );

        Ok(Self {
            l1,
            backend,
            backend_breaker,
            ttl_policy,
            l1_max_ttl: config.l1_max_ttl(),
            l2: L2Counters::default(),
        })
    }

    /// Select the backing store from configuration (never fails on an
    /// unreachable store) and build the service
    pub fn from_config(
        config: &CacheConfig,
        registry: Option<&CircuitBreakerRegistry>,
    ) -> ConfigResult<Self> {
        Self::new(config, connect_graceful(config), registry)
    }

    /// Get a value, L1 first
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.get_with(key, true)
    }

    /// Get a value; `use_l1 = false` reads the backing store only
    pub fn get_with(&self, key: &CacheKey, use_l1: bool) -> Option<String> {
        let use_l1 = use_l1 && !key.skips_l1();

        if use_l1 {
            if let Some(value) = self.l1.get(key.as_str()) {
                debug!(key = %key, layer = "l1", "Cache hit");
                return Some(value);
            }
        }

        match self.l2_call("get", key.as_str(), |store| store.get(key.as_str())) {
            Some(Some(value)) => {
                self.l2.hits.fetch_add(1, Ordering::Relaxed);
                if use_l1 {
                    let ttl = self.l1_ttl(self.ttl_policy.ttl_for(key));
                    self.l1.set(key.as_str(), value.clone(), ttl);
                }
                debug!(key = %key, layer = "l2", backfilled = use_l1, "Cache hit");
                Some(value)
            }
            Some(None) => {
                self.l2.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, layer = "none", "Cache miss");
                None
            }
            None => {
                debug!(key = %key, layer = "none", "Cache miss (backing store unavailable)");
                None
            }
        }
    }

    /// Store a value in both tiers; `ttl = None` uses the category TTL
    pub fn set(&self, key: &CacheKey, value: impl Into<String>, ttl: Option<Duration>) {
        self.set_with(key, value, ttl, true);
    }

    /// Store a value; `use_l1 = false` writes the backing store only
    pub fn set_with(
        &self,
        key: &CacheKey,
        value: impl Into<String>,
        ttl: Option<Duration>,
        use_l1: bool,
    ) {
        let value = value.into();
        let ttl = ttl.unwrap_or_else(|| self.ttl_policy.ttl_for(key));
        let use_l1 = use_l1 && !key.skips_l1();

        let stored_l2 = self
            .l2_call("set", key.as_str(), |store| store.set(key.as_str(), &value, ttl))
            .is_some();

        if use_l1 {
            self.l1.set(key.as_str(), value, self.l1_ttl(ttl));
        }

        let layer = match (use_l1, stored_l2) {
            (true, true) => "l1+l2",
            (true, false) => "l1",
            (false, true) => "l2",
            (false, false) => "none",
        };
        debug!(key = %key, layer = layer, ttl_secs = ttl.as_secs(), "Cache set");
    }

    /// Remove a key from both tiers
    pub fn delete(&self, key: &CacheKey) {
        self.l1.delete(key.as_str());
        self.l2_call("delete", key.as_str(), |store| store.delete(key.as_str()));
        debug!(key = %key, "Cache delete");
    }

    /// Delete every backing store key starting with `prefix`
    ///
    /// L1 copies are not scanned; they age out within `l1_max_ttl`. Returns
    /// the store's count, 0 when the store is unavailable.
    pub fn delete_pattern(&self, prefix: &str) -> u64 {
        let deleted = self
            .l2_call("delete_pattern", prefix, |store| store.delete_pattern(prefix))
            .unwrap_or(0);
        debug!(prefix = prefix, deleted = deleted, "Cache prefix invalidation");
        deleted
    }

    /// Drop every cached key of one user
    pub fn invalidate_user(&self, user_id: impl std::fmt::Display) -> u64 {
        self.delete_pattern(&CacheKey::user_prefix(user_id))
    }

    /// Empty both tiers
    pub fn clear(&self) {
        self.l1.clear();
        self.l2_call("clear", "*", |store| store.clear());
        info!(backend = self.backend.provider_name(), "Cache cleared");
    }

    /// Get and decode a JSON value
    ///
    /// A stored value that does not decode as `T` comes back as
    /// [`CachedJson::Raw`] instead of failing the read.
    pub fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CachedJson<T>> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(CachedJson::Decoded(value)),
            Err(e) => {
                debug!(key = %key, error = %e, "Cached value is not valid JSON for requested type");
                Some(CachedJson::Raw(raw))
            }
        }
    }

    /// Serialize and store a JSON value
    ///
    /// # Errors
    /// Returns `CacheError::SerializationError` (already logged) when `value`
    /// cannot be serialized; nothing is written in that case.
    pub fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let encoded = serde_json::to_string(value).map_err(|e| {
            warn!(key = %key, error = %e, "Skipping cache write, value not serializable");
            CacheError::SerializationError(e.to_string())
        })?;
        self.set(key, encoded, ttl);
        Ok(())
    }

    /// Read-through: return the cached value or run `fetch` and store its result
    ///
    /// Fetch errors are returned unchanged and nothing is cached.
    pub fn cached<E, F>(&self, key: &CacheKey, ttl: Option<Duration>, fetch: F) -> Result<String, E>
    where
        F: FnOnce() -> Result<String, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = fetch()?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// JSON read-through; an undecodable cached value is refetched
    pub fn cached_json<T, E, F>(&self, key: &CacheKey, ttl: Option<Duration>, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(CachedJson::Decoded(value)) = self.get_json(key) {
            return Ok(value);
        }

        let value = fetch()?;
        // Serialization failures are logged inside set_json
        let _ = self.set_json(key, &value, ttl);
        Ok(value)
    }

    /// Sweep expired L1 entries; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.l1.cleanup_expired();
        if removed > 0 {
            debug!(removed = removed, "L1 expired entries swept");
        }
        removed
    }

    /// Run [`CacheService::cleanup_expired`] every `interval` on the tokio runtime
    ///
    /// The task holds only a weak reference and exits once the service is
    /// dropped. Must be called from within a tokio runtime.
    pub fn spawn_cleanup_task(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        let period = interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match service.upgrade() {
                    Some(service) => {
                        service.cleanup_expired();
                    }
                    None => {
                        debug!("Cache service dropped, stopping cleanup task");
                        break;
                    }
                }
            }
        })
    }

    pub fn stats(&self) -> CacheServiceStats {
        CacheServiceStats {
            l1: self.l1.stats(),
            l2: BackingStoreStats {
                hits: self.l2.hits.load(Ordering::Relaxed),
                misses: self.l2.misses.load(Ordering::Relaxed),
                errors: self.l2.errors.load(Ordering::Relaxed),
                skipped: self.l2.skipped.load(Ordering::Relaxed),
            },
            backend: self.backend.provider_name().to_string(),
            backend_circuit_state: self.backend_circuit_state(),
        }
    }

    /// Probe the backing store directly, bypassing the breaker
    pub fn health_check(&self) -> bool {
        match self.backend.health_check() {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(backend = self.backend.provider_name(), error = %e, "Backing store health check failed");
                false
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    pub fn backend_circuit_state(&self) -> Option<CircuitState> {
        self.backend_breaker.as_ref().map(|cb| cb.current_state())
    }

    fn l1_ttl(&self, ttl: Duration) -> Duration {
        ttl.min(self.l1_max_ttl)
    }

    /// Run one backing store call; `None` means skipped or failed
    fn l2_call<T>(
        &self,
        operation: &'static str,
        key: &str,
        f: impl FnOnce(&dyn BackingStore) -> CacheResult<T>,
    ) -> Option<T> {
        let permit = match &self.backend_breaker {
            Some(breaker) => match breaker.try_acquire() {
                Some(permit) => Some(permit),
                None => {
                    self.l2.skipped.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        operation = operation,
                        key = key,
                        "Backing store circuit open, skipping L2"
                    );
                    return None;
                }
            },
            None => None,
        };

        match f(self.backend.as_ref()) {
            Ok(value) => {
                if let Some(permit) = permit {
                    permit.record_success();
                }
                Some(value)
            }
            Err(e) => {
                if let Some(permit) = permit {
                    permit.record_failure();
                }
                self.l2.errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    operation = operation,
                    key = key,
                    backend = self.backend.provider_name(),
                    error = %e,
                    "Backing store call failed, degrading to L1"
                );
                None
            }
        }
    }
}
