//! # Circuit Breaker Registry
//!
//! Process-wide map from dependency name to its single breaker. Creation is
//! atomic through the `DashMap` entry API, so concurrent first callers for the
//! same name always share one instance.

use crate::config::{CircuitBreakersConfig, ConfigResult};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, SystemCircuitBreakerStats};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Named registry of circuit breakers
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,

    /// Component table used by `get_or_create_default`
    config: CircuitBreakersConfig,
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakersConfig::default())
    }
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakersConfig) -> Self {
        info!(
            configured_components = config.component_configs.len(),
            "Initializing circuit breaker registry"
        );

        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    /// Get the breaker registered under `name`, creating it with `config` if absent
    ///
    /// The first registration wins: a later call with different settings gets
    /// the existing breaker and a warning.
    ///
    /// # Errors
    /// Returns a `ConfigurationError` when the breaker must be created and
    /// `config` is invalid. Nothing is registered in that case.
    pub fn get_or_create(
        &self,
        name: &str,
        config: CircuitBreakerConfig,
    ) -> ConfigResult<Arc<CircuitBreaker>> {
        if let Some(existing) = self.breakers.get(name) {
            let breaker = Arc::clone(existing.value());
            drop(existing);
            self.warn_on_mismatch(&breaker, &config);
            return Ok(breaker);
        }

        match self.breakers.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let breaker = Arc::clone(entry.get());
                drop(entry);
                self.warn_on_mismatch(&breaker, &config);
                Ok(breaker)
            }
            Entry::Vacant(entry) => {
                let breaker = Arc::new(CircuitBreaker::new(name, config)?);
                entry.insert(Arc::clone(&breaker));

                let total = self.breakers.len();
                if total > self.config.max_circuit_breakers {
                    warn!(
                        component = name,
                        current_count = total,
                        max_allowed = self.config.max_circuit_breakers,
                        "Circuit breaker count exceeds configured maximum"
                    );
                }

                info!(
                    component = name,
                    total_circuit_breakers = total,
                    "Created new circuit breaker"
                );
                Ok(breaker)
            }
        }
    }

    /// Get or create using the configured settings for `name`
    pub fn get_or_create_default(&self, name: &str) -> ConfigResult<Arc<CircuitBreaker>> {
        let config = self.config.config_for_component(name).to_resilience_config();
        self.get_or_create(name, config)
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered names, sorted
    pub fn list_components(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    pub fn component_stats(&self, name: &str) -> Option<CircuitBreakerStats> {
        self.get(name).map(|breaker| breaker.stats())
    }

    /// Snapshot of every registered breaker
    pub fn all_stats(&self) -> SystemCircuitBreakerStats {
        let mut system = SystemCircuitBreakerStats::new();
        for breaker in self.snapshot() {
            system.add_circuit_breaker(breaker.stats());
        }
        system
    }

    /// Share of breakers not OPEN (1.0 when none are registered)
    pub fn health_score(&self) -> f64 {
        self.all_stats().health_score()
    }

    /// Reset every breaker to CLOSED (manual recovery)
    pub fn reset_all(&self) {
        warn!("Resetting all circuit breakers");
        for breaker in self.snapshot() {
            breaker.reset();
        }
    }

    /// Force every breaker open (emergency stop)
    pub fn force_open_all(&self) {
        warn!("Forcing all circuit breakers open (emergency stop)");
        for breaker in self.snapshot() {
            breaker.force_open();
        }
    }

    /// Clone out the breakers so no map shard lock is held while they lock
    fn snapshot(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn warn_on_mismatch(&self, breaker: &CircuitBreaker, requested: &CircuitBreakerConfig) {
        if breaker.config() != requested {
            warn!(
                component = breaker.name(),
                existing_failure_threshold = breaker.config().failure_threshold,
                requested_failure_threshold = requested.failure_threshold,
                "Circuit breaker already registered with different settings; keeping the original"
            );
        }
    }
}
