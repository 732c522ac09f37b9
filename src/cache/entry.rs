//! Timed cache entry

use std::time::{Duration, Instant};

/// TTLs beyond this are clamped so `Instant` arithmetic cannot overflow.
const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// A cached value with an absolute expiry instant.
///
/// The entry is logically absent from the moment `now >= expires_at`, even
/// while it is still physically held by a cache.
#[derive(Debug, Clone)]
pub struct TimedEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> TimedEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl.min(MAX_TTL),
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_at_boundary() {
        let entry = TimedEntry::new("quote", Duration::from_secs(5));
        let deadline = entry.expires_at();

        assert!(!entry.is_expired_at(deadline - Duration::from_millis(1)));
        assert!(entry.is_expired_at(deadline));
        assert!(entry.is_expired_at(deadline + Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let entry = TimedEntry::new(1u32, Duration::ZERO);
        assert!(entry.is_expired());
        assert_eq!(entry.remaining_ttl(), Duration::ZERO);
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = TimedEntry::new((), Duration::MAX);
        assert!(!entry.is_expired());
    }
}
