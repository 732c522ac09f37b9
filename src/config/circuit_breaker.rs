//! Circuit breaker configuration table
//!
//! Serializable (seconds-based) breaker thresholds keyed by dependency name.
//! Flaky scraped sources get a lower failure threshold and a longer cooldown
//! than the stable quote APIs.

use super::error::{ConfigResult, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Dependency name used by the cache service to protect its backing store
pub const CACHE_BACKEND_COMPONENT: &str = "cache_backend";

/// Circuit breaker configuration with per-component overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakersConfig {
    /// Soft limit on registered breakers; exceeding it only logs a warning
    pub max_circuit_breakers: usize,

    /// Default configuration for new circuit breakers
    pub default_config: CircuitBreakerComponentConfig,

    /// Specific configurations for named components
    pub component_configs: HashMap<String, CircuitBreakerComponentConfig>,
}

/// Circuit breaker configuration for a specific component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerComponentConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,

    /// Number of successful probes in half-open state to close circuit
    pub success_threshold: u32,

    /// Time to wait in open state before attempting recovery (in seconds)
    pub recovery_timeout_seconds: u64,

    /// Concurrent probe calls admitted while half-open
    pub half_open_max_calls: u32,

    /// Age after which an unfinished probe no longer holds its slot (in seconds)
    pub probe_timeout_seconds: u64,
}

impl Default for CircuitBreakerComponentConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout_seconds: 60,
            half_open_max_calls: 3,
            probe_timeout_seconds: 30,
        }
    }
}

impl CircuitBreakerComponentConfig {
    /// Convert to resilience module's format
    pub fn to_resilience_config(&self) -> crate::resilience::CircuitBreakerConfig {
        crate::resilience::CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_seconds),
            half_open_max_calls: self.half_open_max_calls,
            probe_timeout: Duration::from_secs(self.probe_timeout_seconds),
        }
    }
}

impl Default for CircuitBreakersConfig {
    fn default() -> Self {
        let mut component_configs = HashMap::new();

        // Stable vendor APIs
        component_configs.insert(
            "market_data".to_string(),
            CircuitBreakerComponentConfig::default(),
        );
        component_configs.insert(
            "forex".to_string(),
            CircuitBreakerComponentConfig::default(),
        );

        // Scraped sources fail in bursts; trip early and back off longer
        for scraped in ["news", "calendar"] {
            component_configs.insert(
                scraped.to_string(),
                CircuitBreakerComponentConfig {
                    failure_threshold: 3,
                    success_threshold: 1,
                    recovery_timeout_seconds: 300,
                    half_open_max_calls: 1,
                    probe_timeout_seconds: 60,
                },
            );
        }

        component_configs.insert(
            CACHE_BACKEND_COMPONENT.to_string(),
            CircuitBreakerComponentConfig {
                failure_threshold: 3,
                success_threshold: 1,
                recovery_timeout_seconds: 15,
                half_open_max_calls: 1,
                probe_timeout_seconds: 5,
            },
        );

        Self {
            max_circuit_breakers: 50,
            default_config: CircuitBreakerComponentConfig::default(),
            component_configs,
        }
    }
}

impl CircuitBreakersConfig {
    /// Get configuration for a specific component
    pub fn config_for_component(&self, component_name: &str) -> CircuitBreakerComponentConfig {
        self.component_configs
            .get(component_name)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }

    /// Test preset: short cooldowns so recovery paths run quickly
    pub fn for_test() -> Self {
        let mut config = Self::default();
        for component in config
            .component_configs
            .values_mut()
            .chain(std::iter::once(&mut config.default_config))
        {
            component.recovery_timeout_seconds = 1;
            component.probe_timeout_seconds = 1;
        }
        config
    }

    /// Validate every component entry by building its runtime config
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_circuit_breakers == 0 {
            return Err(ConfigurationError::invalid_value(
                "circuit_breakers.max_circuit_breakers",
                0,
                "must be greater than 0",
            ));
        }

        self.default_config.to_resilience_config().validate()?;
        for (name, component) in &self.component_configs {
            component.to_resilience_config().validate().map_err(|e| {
                ConfigurationError::validation_error(format!("component '{name}': {e}"))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_lookup_falls_back_to_default() {
        let config = CircuitBreakersConfig::default();
        let news = config.config_for_component("news");
        assert_eq!(news.failure_threshold, 3);

        let unknown = config.config_for_component("payments_gateway");
        assert_eq!(unknown, config.default_config);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(CircuitBreakersConfig::default().validate().is_ok());
        assert!(CircuitBreakersConfig::for_test().validate().is_ok());
    }

    #[test]
    fn test_invalid_component_reported_by_name() {
        let mut config = CircuitBreakersConfig::default();
        config.component_configs.insert(
            "broken".to_string(),
            CircuitBreakerComponentConfig {
                half_open_max_calls: 0,
                ..Default::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_to_resilience_config_converts_seconds() {
        let runtime = CircuitBreakerComponentConfig::default().to_resilience_config();
        assert_eq!(runtime.recovery_timeout, Duration::from_secs(60));
        assert_eq!(runtime.probe_timeout, Duration::from_secs(30));
        assert_eq!(runtime.half_open_max_calls, 3);
    }
}
