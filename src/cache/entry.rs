//! Cache Entry Module
//!
//! Defines the immutable record stored for each fetched key.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single cached value together with its expiration instant.
///
/// Entries are never mutated after creation. A re-fetch produces a new entry
/// that replaces the old one in the index; callers holding the old one keep
/// an unchanged snapshot.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    key: String,
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry that stays fresh for `ttl` starting now.
    pub fn new(key: impl Into<String>, value: V, ttl: Duration) -> Self {
        Self::with_expiry(key, value, Instant::now() + ttl)
    }

    /// Creates an entry with an explicit expiration instant.
    pub fn with_expiry(key: impl Into<String>, value: V, expires_at: Instant) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    // == Freshness ==
    /// Returns true while the current time is strictly before `expires_at`.
    ///
    /// Evaluated on every call; nothing in the cache flips this flag in the
    /// background.
    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }

    // == Time To Live ==
    /// Remaining time before the entry goes stale, zero once it has.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
