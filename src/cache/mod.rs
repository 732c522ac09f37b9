//! # Layered Cache Module
//!
//! In-process LRU (L1) in front of a shared backing store (L2).
//!
//! ## Architecture
//!
//! ```text
//! CacheService
//!   ├── LruCache<String>            <- L1, per process, TTL capped at l1_max_ttl
//!   └── Arc<dyn BackingStore>       <- L2, selected once at startup
//!         ├── RedisBackingStore     <- shared across replicas (feature cache-redis)
//!         ├── MemoryBackingStore    <- local fallback when Redis is unreachable
//!         └── NoOpBackingStore      <- L2 disabled
//! ```
//!
//! ## Design Decisions
//!
//! - **Graceful degradation**: Redis failure at startup falls back to the
//!   in-process store, never blocks startup
//! - **Best-effort L2**: store errors are logged and counted, never propagated
//! - **Typed keys**: `CacheKey` fixes the category (and so the TTL and L1
//!   eligibility) at construction
//! - **SCAN for prefixes**: non-blocking key iteration (never uses KEYS)
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tradeguard_core::cache::{CacheKey, CacheService, MemoryBackingStore};
//! use tradeguard_core::config::CacheConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheConfig::for_test();
//! let cache = CacheService::new(&config, Arc::new(MemoryBackingStore::new(100)), None)?;
//!
//! let key = CacheKey::forex("EURUSD");
//! let rate = cache.cached(&key, None, || Ok::<_, std::io::Error>("1.0842".to_string()))?;
//! assert_eq!(cache.get(&key), Some(rate));
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod errors;
pub mod keys;
pub mod lru;
pub mod provider;
pub mod providers;
pub mod service;
pub mod traits;

pub use entry::TimedEntry;
pub use errors::{CacheError, CacheResult};
pub use keys::{CacheCategory, CacheKey, TtlPolicy};
pub use lru::{CacheStats, LruCache};
pub use provider::connect_graceful;
pub use providers::{MemoryBackingStore, NoOpBackingStore};
pub use service::{BackingStoreStats, CacheService, CacheServiceStats, CachedJson};
pub use traits::BackingStore;

#[cfg(feature = "cache-redis")]
pub use providers::RedisBackingStore;
