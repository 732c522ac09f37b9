//! # Tradeguard Configuration System
//!
//! Environment-aware configuration for the cache tiers and circuit breakers.
//!
//! ## Architecture
//!
//! - **Environment presets**: `test`, `development`, and production defaults
//! - **Layered loading**: preset, then optional TOML file, then
//!   `TRADEGUARD__*` environment variables (see [`loader`])
//! - **Explicit validation**: invalid thresholds fail at startup, not at call time
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tradeguard_core::config::TradeguardConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TradeguardConfig::load(None)?;
//! let l1_capacity = config.cache.l1_max_size;
//! let news = config.circuit_breakers.config_for_component("news");
//! # let _ = (l1_capacity, news);
//! # Ok(())
//! # }
//! ```

pub mod cache_config;
pub mod circuit_breaker;
pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use cache_config::{CacheConfig, RedisConfig};
pub use circuit_breaker::{
    CircuitBreakerComponentConfig, CircuitBreakersConfig, CACHE_BACKEND_COMPONENT,
};
pub use error::{ConfigResult, ConfigurationError};
pub use loader::detect_environment;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeguardConfig {
    /// Deployment environment (development, test, production, ...)
    pub environment: String,

    /// Layered cache settings
    pub cache: CacheConfig,

    /// Circuit breaker thresholds per dependency
    pub circuit_breakers: CircuitBreakersConfig,
}

impl Default for TradeguardConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            cache: CacheConfig::default(),
            circuit_breakers: CircuitBreakersConfig::default(),
        }
    }
}

impl TradeguardConfig {
    /// Preset for a named environment
    pub fn for_environment(environment: &str) -> Self {
        let circuit_breakers = if environment == "test" {
            CircuitBreakersConfig::for_test()
        } else {
            CircuitBreakersConfig::default()
        };

        Self {
            environment: environment.to_string(),
            cache: CacheConfig::for_environment(environment),
            circuit_breakers,
        }
    }

    /// Preset for the detected environment plus conventional env overrides
    ///
    /// Does not read any configuration file; see [`TradeguardConfig::load`].
    pub fn from_environment() -> Self {
        let environment = detect_environment();
        info!(environment = %environment, "Loading environment configuration preset");

        let mut config = Self::for_environment(&environment);
        config.cache = config.cache.with_env_overrides();
        config
    }

    pub fn is_test_environment(&self) -> bool {
        self.environment == "test"
    }

    pub fn is_production_environment(&self) -> bool {
        self.environment == "production"
    }

    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> ConfigResult<()> {
        if self.environment.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "environment",
                "root configuration",
            ));
        }

        self.cache.validate()?;
        self.circuit_breakers.validate()?;
        Ok(())
    }

    /// Log the effective configuration
    pub fn log_configuration(&self) {
        info!("Tradeguard configuration (environment: {})", self.environment);
        self.cache.log_configuration();
        info!(
            "Circuit breakers: {} component configs, default failure_threshold={}",
            self.circuit_breakers.component_configs.len(),
            self.circuit_breakers.default_config.failure_threshold
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_presets_validate() {
        for env in ["test", "development", "production"] {
            let config = TradeguardConfig::for_environment(env);
            assert_eq!(config.environment, env);
            assert!(config.validate().is_ok(), "preset {env} should validate");
        }
        assert!(TradeguardConfig::for_environment("production").is_production_environment());
        assert!(!TradeguardConfig::for_environment("development").is_production_environment());
    }

    #[test]
    fn test_test_preset_uses_short_recovery() {
        let config = TradeguardConfig::for_environment("test");
        assert!(config.is_test_environment());
        assert_eq!(
            config
                .circuit_breakers
                .config_for_component("market_data")
                .recovery_timeout_seconds,
            1
        );
    }

    #[test]
    fn test_empty_environment_rejected() {
        let config = TradeguardConfig {
            environment: String::new(),
            ..TradeguardConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
