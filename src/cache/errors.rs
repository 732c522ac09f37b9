//! Cache error types

use thiserror::Error;

/// Errors that can occur during backing store operations
///
/// `CacheService` never surfaces these for get/set/delete; they are logged
/// and treated as a miss or a skipped write.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Failed to connect to cache backend
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// Failed to serialize or deserialize cache value
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// Generic backend error
    #[error("Cache backend error: {0}")]
    BackendError(String),
}

impl CacheError {
    /// Whether the failure means the store itself is unreachable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
