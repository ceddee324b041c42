//! Cache Proxy - A read-through caching proxy in front of Redis
//!
//! Serves values over HTTP from a bounded in-memory cache with TTL
//! freshness and LRU eviction. Misses are fetched from the backing store
//! once per key no matter how many requests wait on them.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;

pub use api::AppState;
pub use cache::{Cache, CacheSettings};
pub use config::Config;
pub use fetcher::Fetcher;
