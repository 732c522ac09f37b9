//! Resilience context
//!
//! The startup-time dependency container: one `CacheService` and one
//! `CircuitBreakerRegistry` per process, built explicitly and passed to the
//! code that needs them. There is no hidden global instance.

use crate::cache::{connect_graceful, BackingStore, CacheService};
use crate::config::{ConfigResult, TradeguardConfig};
use crate::resilience::{CircuitBreaker, CircuitBreakerRegistry};
use std::sync::Arc;
use tracing::info;

/// Shared cache and circuit breakers
///
/// Cheap to clone; clones share the same cache and registry.
#[derive(Debug, Clone)]
pub struct ResilienceContext {
    pub config: Arc<TradeguardConfig>,
    pub cache: Arc<CacheService>,
    pub circuit_breakers: Arc<CircuitBreakerRegistry>,
}

impl ResilienceContext {
    /// Build from configuration, selecting the backing store with graceful
    /// degradation
    ///
    /// # Errors
    /// Fails only on invalid configuration; an unreachable Redis is not an error.
    pub fn from_config(config: TradeguardConfig) -> ConfigResult<Self> {
        let backend = connect_graceful(&config.cache);
        Self::with_backing_store(config, backend)
    }

    /// Build with an explicitly chosen backing store
    pub fn with_backing_store(
        config: TradeguardConfig,
        backend: Arc<dyn BackingStore>,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let circuit_breakers = Arc::new(CircuitBreakerRegistry::new(
            config.circuit_breakers.clone(),
        ));
        let cache = Arc::new(CacheService::new(
            &config.cache,
            backend,
            Some(circuit_breakers.as_ref()),
        )?);

        info!(
            environment = %config.environment,
            backend = cache.backend_name(),
            "Resilience context initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            cache,
            circuit_breakers,
        })
    }

    /// Build from the detected environment preset plus `TRADEGUARD_*` overrides
    pub fn from_environment() -> ConfigResult<Self> {
        Self::from_config(TradeguardConfig::from_environment())
    }

    /// Breaker for a dependency, using its configured settings
    pub fn breaker(&self, name: &str) -> ConfigResult<Arc<CircuitBreaker>> {
        self.circuit_breakers.get_or_create_default(name)
    }

    /// Start the periodic L1 sweep at the configured interval
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        self.cache
            .spawn_cleanup_task(self.config.cache.cleanup_interval())
    }
}
