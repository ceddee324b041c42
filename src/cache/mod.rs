//! Cache Module
//!
//! Read-through caching with lazy TTL expiry, LRU eviction and single-flight
//! fetches.

mod coordinator;
mod entry;
mod recency;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use recency::{NodeHandle, RecencyList};
pub use stats::CacheStats;
pub use store::{Cache, CacheSettings};

pub(crate) use stats::StatsRecorder;

// == Public Constants ==
/// Maximum key length in bytes accepted by the proxy
pub const MAX_KEY_LENGTH: usize = 256;
