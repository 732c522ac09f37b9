//! Crate-level error type
//!
//! Aggregates the module errors for startup paths and for callers that want
//! one error type at their boundary.

use crate::cache::CacheError;
use crate::config::ConfigurationError;
use crate::resilience::CircuitBreakerError;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeguardError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Cache error: {0}")]
    CacheError(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
    #[error("Upstream call failed: {0}")]
    UpstreamFailure(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl TradeguardError {
    /// The dependency is known to be down and the call was not attempted
    ///
    /// HTTP layers map this to 503 rather than a generic 500.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::CircuitBreakerOpen(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<CacheError> for TradeguardError {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::SerializationError(msg) => Self::SerializationError(msg),
            other => Self::CacheError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TradeguardError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(format!("JSON serialization error: {error}"))
    }
}

impl<E: Display> From<CircuitBreakerError<E>> for TradeguardError {
    fn from(error: CircuitBreakerError<E>) -> Self {
        match error {
            CircuitBreakerError::CircuitOpen { component } => Self::CircuitBreakerOpen(component),
            CircuitBreakerError::OperationFailed(e) => Self::UpstreamFailure(e.to_string()),
        }
    }
}

pub type TradeguardResult<T> = Result<T, TradeguardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_circuit_maps_to_upstream_unavailable() {
        let err: TradeguardError = CircuitBreakerError::<String>::CircuitOpen {
            component: "news".to_string(),
        }
        .into();
        assert!(err.is_upstream_unavailable());
        assert_eq!(err.to_string(), "Circuit breaker open: news");
    }

    #[test]
    fn test_failed_call_is_not_unavailable() {
        let err: TradeguardError =
            CircuitBreakerError::OperationFailed("HTTP 502 from vendor").into();
        assert!(!err.is_upstream_unavailable());
        assert!(matches!(err, TradeguardError::UpstreamFailure(_)));
    }

    #[test]
    fn test_configuration_errors_convert() {
        let err: TradeguardError =
            ConfigurationError::missing_required_field("cache.redis.url", "redis backend").into();
        assert!(err.is_configuration());
    }
}
