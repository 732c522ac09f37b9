//! Backing store selection with graceful degradation
//!
//! The configured backend is probed once at startup. A Redis backend that
//! cannot be reached degrades to the in-process memory store; the process
//! never fails to start because of the cache.

use super::providers::{MemoryBackingStore, NoOpBackingStore};
use super::traits::BackingStore;
use crate::config::CacheConfig;
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(feature = "cache-redis")]
use super::providers::RedisBackingStore;

/// Create the backing store named by `config.backend`
///
/// - `"redis"` / `"dragonfly"`: Redis after a successful PING, else memory
/// - `"memory"` / `"local"` / `"in-memory"`: in-process store
/// - `"none"` / `"noop"` / `"disabled"`: L1-only operation
/// - anything else: warning, then memory
pub fn connect_graceful(config: &CacheConfig) -> Arc<dyn BackingStore> {
    match config.backend.as_str() {
        "redis" | "dragonfly" => connect_redis(config),
        "memory" | "local" | "in-memory" => memory_store(config),
        "none" | "noop" | "disabled" => {
            info!("Shared cache tier disabled by configuration");
            Arc::new(NoOpBackingStore::new())
        }
        other => {
            warn!(
                backend = other,
                "Unknown cache backend, falling back to in-process store"
            );
            memory_store(config)
        }
    }
}

fn memory_store(config: &CacheConfig) -> Arc<dyn BackingStore> {
    info!(
        backend = "memory",
        max_entries = config.local_store_max_entries,
        "In-process backing store initialized"
    );
    Arc::new(MemoryBackingStore::new(config.local_store_max_entries))
}

#[cfg(feature = "cache-redis")]
fn connect_redis(config: &CacheConfig) -> Arc<dyn BackingStore> {
    let Some(redis_config) = &config.redis else {
        warn!("Redis backend selected but no [cache.redis] section found, using in-process store");
        return memory_store(config);
    };

    match RedisBackingStore::from_config(redis_config) {
        Ok(store) => {
            info!(
                backend = %config.backend,
                key_prefix = %redis_config.key_prefix,
                "Distributed backing store initialized successfully"
            );
            Arc::new(store)
        }
        Err(e) => {
            warn!(
                error = %e,
                "Failed to connect to Redis, falling back to in-process store (graceful degradation)"
            );
            memory_store(config)
        }
    }
}

/// Fallback when the cache-redis feature is not enabled
#[cfg(not(feature = "cache-redis"))]
fn connect_redis(config: &CacheConfig) -> Arc<dyn BackingStore> {
    warn!("Redis backend requested but 'cache-redis' feature not enabled, using in-process store");
    memory_store(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_backend(backend: &str) -> CacheConfig {
        CacheConfig {
            backend: backend.to_string(),
            ..CacheConfig::for_test()
        }
    }

    #[test]
    fn test_memory_aliases() {
        for backend in ["memory", "local", "in-memory"] {
            let store = connect_graceful(&config_with_backend(backend));
            assert_eq!(store.provider_name(), "memory");
        }
    }

    #[test]
    fn test_disabled_backend_is_noop() {
        let store = connect_graceful(&config_with_backend("none"));
        assert_eq!(store.provider_name(), "noop");
    }

    #[test]
    fn test_unknown_backend_falls_back_to_memory() {
        let store = connect_graceful(&config_with_backend("memcached"));
        assert_eq!(store.provider_name(), "memory");
    }

    #[test]
    fn test_unreachable_redis_degrades_to_memory() {
        let config = CacheConfig {
            backend: "redis".to_string(),
            redis: Some(crate::config::RedisConfig {
                url: "redis://127.0.0.1:1/0".to_string(),
                connection_timeout_seconds: 1,
                key_prefix: "tradeguard-test:".to_string(),
                pool_size: 2,
            }),
            ..CacheConfig::for_test()
        };

        let store = connect_graceful(&config);
        assert_eq!(store.provider_name(), "memory");
        assert!(!store.is_distributed());
    }

    #[test]
    fn test_redis_without_section_degrades_to_memory() {
        let config = CacheConfig {
            backend: "dragonfly".to_string(),
            redis: None,
            ..CacheConfig::for_test()
        };
        assert_eq!(connect_graceful(&config).provider_name(), "memory");
    }
}
