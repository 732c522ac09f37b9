#![allow(clippy::doc_markdown)] // Allow technical terms like HALF_OPEN, Redis in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tradeguard Core
//!
//! Resilience and caching core for market data services.
//!
//! ## Overview
//!
//! Upstream data sources (quote vendors, forex feeds, scraped news and
//! economic calendars) are slow and fail in bursts. This crate keeps request
//! paths fast and alive with two building blocks:
//!
//! - a **layered cache**: per-process LRU (L1) in front of a shared backing
//!   store such as Redis (L2), with per-category TTLs
//! - **circuit breakers**: one per dependency, failing fast with a fallback
//!   while the dependency is down and probing for recovery
//!
//! ## Module Organization
//!
//! - [`cache`] - LRU, backing stores, and the two-tier `CacheService`
//! - [`resilience`] - circuit breaker state machine and registry
//! - [`config`] - environment presets, TOML + env layering, validation
//! - [`context`] - `ResilienceContext`, the startup dependency container
//! - [`error`] - crate-level error type
//! - [`logging`] - `tracing` subscriber setup
//!
//! ## Quick Start
//!
//! ```rust
//! use tradeguard_core::cache::CacheKey;
//! use tradeguard_core::config::TradeguardConfig;
//! use tradeguard_core::ResilienceContext;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let context = ResilienceContext::from_config(TradeguardConfig::for_environment("test"))?;
//! let breaker = context.breaker("market_data")?;
//! let key = CacheKey::market_quote("EURUSD");
//!
//! let quote = match context.cache.get(&key) {
//!     Some(quote) => quote,
//!     None => {
//!         let quote = breaker.call_with_fallback(
//!             || Ok::<_, String>("1.0842".to_string()), // vendor call
//!             || Ok("1.0840".to_string()),             // last known quote
//!         )?;
//!         context.cache.set(&key, quote.clone(), None);
//!         quote
//!     }
//! };
//! assert_eq!(quote, "1.0842");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod resilience;

pub use cache::{CacheKey, CacheService};
pub use config::{ConfigurationError, TradeguardConfig};
pub use context::ResilienceContext;
pub use error::{TradeguardError, TradeguardResult};
pub use resilience::{CircuitBreaker, CircuitBreakerError, CircuitBreakerRegistry, CircuitState};
