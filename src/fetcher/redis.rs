//! Redis fetcher
//!
//! Issues a single `GET` per fetch over a multiplexed connection that is
//! opened on first use and shared by every later fetch to the same address.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, warn};

use super::Fetcher;

/// Port appended to addresses that do not name one.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

// == Redis Fetcher ==
/// Fetches string values from Redis.
///
/// The server address comes from the cache's backend setting on every call;
/// without one, the local default instance is used.
pub struct RedisFetcher {
    io_timeout: Duration,
    connections: Mutex<HashMap<String, MultiplexedConnection>>,
}

impl Default for RedisFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_IO_TIMEOUT)
    }
}

impl RedisFetcher {
    /// `io_timeout` bounds both connecting and waiting for the reply.
    pub fn new(io_timeout: Duration) -> Self {
        Self {
            io_timeout,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the shared connection for `addr`, opening it if needed.
    async fn connection(&self, addr: &str) -> anyhow::Result<MultiplexedConnection> {
        if let Some(conn) = self.connections.lock().await.get(addr) {
            return Ok(conn.clone());
        }

        let client = Client::open(format!("redis://{addr}/"))
            .with_context(|| format!("invalid redis address {addr}"))?;
        let conn = time::timeout(self.io_timeout, client.get_multiplexed_async_connection())
            .await
            .with_context(|| format!("timed out connecting to redis at {addr}"))?
            .with_context(|| format!("failed to connect to redis at {addr}"))?;
        debug!(%addr, "connected to redis");

        self.connections
            .lock()
            .await
            .insert(addr.to_string(), conn.clone());
        Ok(conn)
    }

    /// Drops the cached connection so the next fetch reconnects.
    async fn forget(&self, addr: &str) {
        if self.connections.lock().await.remove(addr).is_some() {
            warn!(%addr, "dropped redis connection");
        }
    }
}

#[async_trait]
impl Fetcher<String> for RedisFetcher {
    async fn fetch(&self, key: &str, backend: Option<&str>) -> anyhow::Result<Option<String>> {
        let addr = normalize_addr(backend.unwrap_or(DEFAULT_HOST));
        debug!(key, %addr, "redis GET");

        let mut conn = self.connection(&addr).await?;
        let reply: RedisResult<Option<String>> =
            match time::timeout(self.io_timeout, conn.get(key)).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.forget(&addr).await;
                    bail!("timed out waiting for redis at {addr}");
                }
            };

        match reply {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_io_error() || err.is_connection_dropped() {
                    self.forget(&addr).await;
                }
                Err(err).with_context(|| format!("redis GET {key} failed"))
            }
        }
    }
}

// == Address Normalization ==
/// Appends the default port unless the address already ends in `:<port>`.
pub fn normalize_addr(addr: &str) -> String {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => addr.to_string(),
        _ => format!("{addr}:{DEFAULT_REDIS_PORT}"),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_normalize_addr() {
        assert_eq!(normalize_addr("localhost"), "localhost:6379");
        assert_eq!(normalize_addr("localhost:7000"), "localhost:7000");
        assert_eq!(normalize_addr("10.0.0.5:6380"), "10.0.0.5:6380");
        assert_eq!(normalize_addr("redis.internal:http"), "redis.internal:http:6379");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let fetcher = RedisFetcher::new(Duration::from_secs(1));
        let result = fetcher.fetch("foo", Some(&addr)).await;

        assert!(result.is_err());
        assert!(fetcher.connections.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_from_server_that_hangs_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                drop(socket);
            }
        });

        let fetcher = RedisFetcher::new(Duration::from_secs(1));
        let result = fetcher.fetch("foo", Some(&addr)).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "needs a Redis server on 127.0.0.1:6379"]
    async fn test_fetch_against_local_redis() {
        let client = Client::open("redis://127.0.0.1:6379/").unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.set("cache_proxy:test", "bar").await.unwrap();
        let _: () = conn.del("cache_proxy:missing").await.unwrap();

        let fetcher = RedisFetcher::default();
        assert_eq!(
            fetcher.fetch("cache_proxy:test", None).await.unwrap(),
            Some("bar".to_string())
        );
        assert_eq!(fetcher.fetch("cache_proxy:missing", None).await.unwrap(), None);
        assert_eq!(fetcher.connections.lock().await.len(), 1);
    }
}
