//! Backing store implementations

pub mod memory;
pub mod noop;

#[cfg(feature = "cache-redis")]
pub mod redis;

pub use memory::MemoryBackingStore;
pub use noop::NoOpBackingStore;

#[cfg(feature = "cache-redis")]
pub use self::redis::RedisBackingStore;
