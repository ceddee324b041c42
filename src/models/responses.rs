//! Response DTOs for the proxy API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheEntry, CacheStats};

/// Response body for a key lookup.
///
/// `value` and `ttl_remaining_ms` are null when the key does not exist
/// upstream.
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse<V> {
    /// The requested key
    pub key: String,
    /// The cached value
    pub value: Option<V>,
    /// Milliseconds until the cached copy goes stale
    pub ttl_remaining_ms: Option<u64>,
}

impl<V: Clone> GetResponse<V> {
    /// Creates a response from a cache entry
    pub fn found(entry: &CacheEntry<V>) -> Self {
        Self {
            key: entry.key().to_string(),
            value: Some(entry.value().clone()),
            ttl_remaining_ms: Some(entry.ttl_remaining().as_millis() as u64),
        }
    }

    /// Creates a response for a key the backing store does not have
    pub fn absent(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            ttl_remaining_ms: None,
        }
    }
}

/// Response body for the stats endpoint (GET /_stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        let hit_rate = stats.hit_rate();
        Self { stats, hit_rate }
    }
}

/// Response body for the health endpoint (GET /_health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
