//! Cache Configuration Management
//!
//! Configuration for the two cache tiers: the in-process LRU (L1) and the
//! shared backing store (L2). Presets differ per environment so tests get
//! small, fast-expiring caches while production keeps the documented TTLs.

use super::error::{ConfigResult, ConfigurationError};
use crate::cache::CacheCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for the layered cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backing store: "redis" (alias "dragonfly"), "memory", or "none"
    pub backend: String,

    /// Redis connection settings, required when `backend = "redis"`
    pub redis: Option<RedisConfig>,

    /// Maximum number of entries held by the in-process LRU
    pub l1_max_size: usize,

    /// Upper bound on any L1 entry lifetime (caps staleness of shared data)
    pub l1_max_ttl_seconds: u64,

    /// TTL for keys that carry no namespace category
    pub default_ttl_seconds: u64,

    /// Per-category TTL overrides keyed by category name (e.g. `forex = 30`)
    pub ttl_overrides: HashMap<String, u64>,

    /// Interval of the periodic L1 expiry sweep
    pub cleanup_interval_seconds: u64,

    /// Capacity of the in-process fallback store used when Redis is unreachable
    pub local_store_max_entries: usize,

    /// Route L2 calls through the `cache_backend` circuit breaker
    pub backend_circuit_breaker: bool,
}

/// Redis connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub connection_timeout_seconds: u64,
    /// Prefix applied to every key written by this process; `clear()` only
    /// touches keys under it
    pub key_prefix: String,
    /// Maximum pooled connections; concurrent L2 calls beyond this wait for one
    pub pool_size: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            connection_timeout_seconds: 2,
            key_prefix: "tradeguard:".to_string(),
            pool_size: 16,
        }
    }
}

impl RedisConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds.max(1))
    }
}

impl Default for CacheConfig {
    /// Default configuration suitable for production
    fn default() -> Self {
        Self {
            backend: "redis".to_string(),
            redis: Some(RedisConfig::default()),
            l1_max_size: 1000,
            l1_max_ttl_seconds: 60,
            default_ttl_seconds: 300,
            ttl_overrides: HashMap::new(),
            cleanup_interval_seconds: 60,
            local_store_max_entries: 5000,
            backend_circuit_breaker: true,
        }
    }
}

impl CacheConfig {
    /// Create test-optimized configuration: in-process only, small and fast
    pub fn for_test() -> Self {
        Self {
            backend: "memory".to_string(),
            redis: None,
            l1_max_size: 100,
            l1_max_ttl_seconds: 60,
            default_ttl_seconds: 60,
            ttl_overrides: HashMap::new(),
            cleanup_interval_seconds: 5,
            local_store_max_entries: 500,
            backend_circuit_breaker: false,
        }
    }

    /// Create development-optimized configuration
    pub fn for_development() -> Self {
        Self {
            l1_max_size: 500,
            cleanup_interval_seconds: 30,
            local_store_max_entries: 1000,
            ..Self::default()
        }
    }

    /// Preset for a named environment (unknown names get production defaults)
    pub fn for_environment(environment: &str) -> Self {
        match environment {
            "test" => Self::for_test(),
            "development" => Self::for_development(),
            _ => Self::default(),
        }
    }

    /// Apply conventional environment variable overrides
    ///
    /// `REDIS_URL` is honored for compatibility with hosting platforms that
    /// inject it; `TRADEGUARD_REDIS_URL` wins when both are present.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(backend) = env::var("TRADEGUARD_CACHE_BACKEND") {
            info!(backend = %backend, "Cache backend override");
            self.backend = backend;
        }

        let redis_url = env::var("TRADEGUARD_REDIS_URL").or_else(|_| env::var("REDIS_URL"));
        if let Ok(url) = redis_url {
            let redis = self.redis.get_or_insert_with(RedisConfig::default);
            redis.url = url;
            info!("Redis URL override applied");
        }

        if let Ok(size) = env::var("TRADEGUARD_L1_MAX_SIZE") {
            if let Ok(entries) = size.parse::<usize>() {
                self.l1_max_size = entries;
                info!("L1 cache max size override: {}", entries);
            }
        }

        self
    }

    pub fn l1_max_ttl(&self) -> Duration {
        Duration::from_secs(self.l1_max_ttl_seconds)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }

    /// Parse the TTL override table into typed categories
    pub fn parsed_ttl_overrides(&self) -> ConfigResult<HashMap<CacheCategory, Duration>> {
        self.ttl_overrides
            .iter()
            .map(|(name, seconds)| {
                let category = CacheCategory::from_str(name).map_err(|_| {
                    ConfigurationError::invalid_value(
                        format!("cache.ttl_overrides.{name}"),
                        name,
                        "unknown cache category",
                    )
                })?;
                Ok((category, Duration::from_secs(*seconds)))
            })
            .collect()
    }

    /// Log current configuration for debugging
    pub fn log_configuration(&self) {
        info!("Cache Configuration:");
        info!("  Backend: {}", self.backend);
        info!(
            "  L1: {} max entries, {}s max TTL",
            self.l1_max_size, self.l1_max_ttl_seconds
        );
        info!("  Default TTL: {}s", self.default_ttl_seconds);
        for (category, seconds) in &self.ttl_overrides {
            info!("  TTL override: {} = {}s", category, seconds);
        }
        info!("  Cleanup Interval: {}s", self.cleanup_interval_seconds);
        info!(
            "  Backend circuit breaker: {}",
            self.backend_circuit_breaker
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.l1_max_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.l1_max_size",
                self.l1_max_size,
                "L1 capacity must be at least 1",
            ));
        }

        if self.cleanup_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.cleanup_interval_seconds",
                0,
                "cleanup interval must be greater than 0",
            ));
        }

        if matches!(self.backend.as_str(), "redis" | "dragonfly") {
            match &self.redis {
                None => {
                    return Err(ConfigurationError::missing_required_field(
                        "cache.redis",
                        "redis cache backend",
                    ))
                }
                Some(redis) if redis.url.is_empty() => {
                    return Err(ConfigurationError::missing_required_field(
                        "cache.redis.url",
                        "redis cache backend",
                    ))
                }
                Some(redis) if redis.pool_size == 0 => {
                    return Err(ConfigurationError::invalid_value(
                        "cache.redis.pool_size",
                        0,
                        "must be greater than 0",
                    ))
                }
                Some(_) => {}
            }
        }

        self.parsed_ttl_overrides()?;

        if self.l1_max_ttl_seconds == 0 {
            warn!("L1 max TTL is 0 - in-process caching effectively disabled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
        assert!(CacheConfig::for_test().validate().is_ok());
        assert!(CacheConfig::for_development().validate().is_ok());
    }

    #[test]
    fn test_zero_l1_size_rejected() {
        let config = CacheConfig {
            l1_max_size: 0,
            ..CacheConfig::for_test()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_redis_backend_requires_redis_section() {
        let config = CacheConfig {
            backend: "redis".to_string(),
            redis: None,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_zero_redis_pool_size_rejected() {
        let config = CacheConfig {
            redis: Some(RedisConfig {
                pool_size: 0,
                ..RedisConfig::default()
            }),
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "cache.redis.pool_size"
        ));
    }

    #[test]
    fn test_ttl_overrides_parse_categories() {
        let mut config = CacheConfig::for_test();
        config.ttl_overrides.insert("forex".to_string(), 30);
        config.ttl_overrides.insert("ratelimit".to_string(), 10);

        let parsed = config.parsed_ttl_overrides().unwrap();
        assert_eq!(parsed[&CacheCategory::Forex], Duration::from_secs(30));
        assert_eq!(parsed[&CacheCategory::RateLimit], Duration::from_secs(10));
    }

    #[test]
    fn test_unknown_ttl_category_rejected() {
        let mut config = CacheConfig::for_test();
        config.ttl_overrides.insert("crypto".to_string(), 30);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_presets() {
        assert_eq!(CacheConfig::for_environment("test").backend, "memory");
        assert_eq!(CacheConfig::for_environment("development").l1_max_size, 500);
        assert_eq!(CacheConfig::for_environment("staging"), CacheConfig::default());
    }
}
