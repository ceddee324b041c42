//! Configuration Module
//!
//! Command-line flags, each of which can also be supplied through an
//! environment variable.

use std::time::Duration;

use clap::Parser;

use crate::cache::CacheSettings;
use crate::error::Result;

/// Proxy configuration parameters.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "cache_proxy",
    version,
    about = "Read-through caching proxy in front of a Redis server",
    long_about = None
)]
pub struct Config {
    /// HTTP server port
    #[arg(short = 'p', long = "port", env = "SERVER_PORT", default_value_t = 3000)]
    pub server_port: u16,

    /// Maximum number of entries the cache can hold
    #[arg(short = 'c', long = "capacity", env = "MAX_ENTRIES", default_value_t = 1000)]
    pub max_entries: usize,

    /// Seconds an entry stays fresh after it is fetched
    #[arg(short = 'e', long = "ttl", env = "CACHE_TTL", default_value_t = 300)]
    pub ttl_secs: u64,

    /// Seconds a fetch may stay in flight before it is considered abandoned
    #[arg(long = "fetch-timeout", env = "FETCH_TIMEOUT", default_value_t = 5)]
    pub fetch_timeout_secs: u64,

    /// Upstream Redis address (host or host:port)
    #[arg(short = 'r', long = "redis", env = "REDIS_ADDR")]
    pub redis_addr: Option<String>,
}

impl Config {
    /// Builds the cache settings, rejecting zero capacity, ttl or timeout.
    pub fn cache_settings(&self) -> Result<CacheSettings> {
        let settings = CacheSettings::new(
            self.max_entries,
            Duration::from_secs(self.ttl_secs),
            Duration::from_secs(self.fetch_timeout_secs),
        )?;

        Ok(match &self.redis_addr {
            Some(addr) => settings.with_backend(addr.clone()),
            None => settings,
        })
    }
}
