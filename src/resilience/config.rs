//! # Circuit Breaker Configuration
//!
//! Runtime (`Duration`-based) settings for a single breaker. The serializable,
//! seconds-based table lives in `crate::config::CircuitBreakersConfig`.

use crate::config::{ConfigResult, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,

    /// Number of successful probes in half-open state to close circuit
    pub success_threshold: u32,

    /// Time to wait in open state before attempting recovery
    pub recovery_timeout: Duration,

    /// Concurrent probe calls admitted while half-open
    pub half_open_max_calls: u32,

    /// Age after which an unfinished probe stops holding its slot
    pub probe_timeout: Duration,
}

impl CircuitBreakerConfig {
    /// Stable streaming/REST quote vendors
    pub fn for_market_data() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
            probe_timeout: Duration::from_secs(30),
        }
    }

    /// Scraped sources (news, economic calendar): trip early, back off longer
    pub fn for_scraped_feed() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 1,
            recovery_timeout: Duration::from_secs(300),
            half_open_max_calls: 1,
            probe_timeout: Duration::from_secs(60),
        }
    }

    /// Generic third-party HTTP API
    pub fn for_external_api() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(45),
            half_open_max_calls: 2,
            probe_timeout: Duration::from_secs(30),
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "failure_threshold",
                self.failure_threshold,
                "must be greater than 0",
            ));
        }

        if self.failure_threshold > 100 {
            return Err(ConfigurationError::invalid_value(
                "failure_threshold",
                self.failure_threshold,
                "should not exceed 100",
            ));
        }

        if self.success_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "success_threshold",
                self.success_threshold,
                "must be greater than 0",
            ));
        }

        if self.success_threshold > 50 {
            return Err(ConfigurationError::invalid_value(
                "success_threshold",
                self.success_threshold,
                "should not exceed 50",
            ));
        }

        if self.recovery_timeout.is_zero() {
            return Err(ConfigurationError::invalid_value(
                "recovery_timeout",
                "0s",
                "must be greater than 0",
            ));
        }

        if self.recovery_timeout > Duration::from_secs(3600) {
            return Err(ConfigurationError::invalid_value(
                "recovery_timeout",
                format!("{}s", self.recovery_timeout.as_secs()),
                "should not exceed 3600 seconds",
            ));
        }

        if self.half_open_max_calls == 0 {
            return Err(ConfigurationError::invalid_value(
                "half_open_max_calls",
                self.half_open_max_calls,
                "must be greater than 0",
            ));
        }

        if self.probe_timeout.is_zero() {
            return Err(ConfigurationError::invalid_value(
                "probe_timeout",
                "0s",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::for_market_data()
    }
}
