//! # Resilience Module
//!
//! Per-dependency circuit breakers that isolate failing upstream data sources
//! (quote vendors, forex feeds, scraped news and calendars) so one outage
//! degrades to fallbacks instead of stalling every request.
//!
//! ## Architecture
//!
//! - **CircuitBreaker**: CLOSED / OPEN / HALF_OPEN state machine around sync or async calls
//! - **CircuitBreakerRegistry**: one breaker per dependency name for the process lifetime
//! - **Stats**: read-only snapshots with a bounded transition history
//!
//! ## Usage
//!
//! ```rust
//! use tradeguard_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::new("forex", CircuitBreakerConfig::for_market_data())?;
//!
//! let rate = breaker.call_with_fallback(
//!     || Err::<f64, String>("vendor timeout".to_string()),
//!     || Ok(1.0842), // last known rate
//! )?;
//! assert_eq!(rate, 1.0842);
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod metrics;
pub mod registry;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerError, CircuitState};
pub use config::CircuitBreakerConfig;
pub use metrics::{CircuitBreakerStats, StateTransition, SystemCircuitBreakerStats};
pub use registry::CircuitBreakerRegistry;
