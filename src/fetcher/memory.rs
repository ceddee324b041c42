//! In-memory fetcher backed by a fixed data set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::Fetcher;

// == Map Fetcher ==
/// Serves values from a `HashMap`, counting every invocation.
///
/// Clones share the invocation counter.
#[derive(Debug, Clone)]
pub struct MapFetcher<V> {
    data: Arc<HashMap<String, V>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl<V> MapFetcher<V> {
    pub fn new(data: HashMap<String, V>) -> Self {
        Self {
            data: Arc::new(data),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Makes every fetch sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `fetch` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for MapFetcher<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[async_trait]
impl<V> Fetcher<V> for MapFetcher<V>
where
    V: Clone + Send + Sync,
{
    async fn fetch(&self, key: &str, _backend: Option<&str>) -> anyhow::Result<Option<V>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(key, "map fetcher lookup");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self.data.get(key).cloned())
    }
}
