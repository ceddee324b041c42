//! Fetcher Module
//!
//! The seam between the cache and the slow backing store it fronts.
//!
//! # Implementations
//! - [`RedisFetcher`] - `GET` against a Redis server
//! - [`MapFetcher`] - fixed in-memory data set, used by tests

use async_trait::async_trait;

mod memory;
mod redis;

pub use memory::MapFetcher;
pub use redis::{normalize_addr, RedisFetcher, DEFAULT_REDIS_PORT};

// == Fetcher Trait ==
/// Retrieves raw values from the backing store on a cache miss.
///
/// `Ok(None)` means the key does not exist upstream; it is a valid outcome,
/// not an error. `backend` is the optional store address configured on the
/// cache, passed through untouched.
#[async_trait]
pub trait Fetcher<V>: Send + Sync {
    async fn fetch(&self, key: &str, backend: Option<&str>) -> anyhow::Result<Option<V>>;
}
