//! Cache Store Module
//!
//! Read-through cache engine combining a key index, a recency list for LRU
//! eviction, lazy TTL expiry and single-flight fetches.
//!
//! # Locking
//! - The index and recency list form one unit behind a `RwLock`. Lookups take
//!   the read lock; inserts, removals and promotions take the write lock.
//! - In-flight fetch markers live behind the coordinator's own lock.
//! - The backing store is called from a spawned task holding neither lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::time;
use tracing::{debug, info, warn};

use crate::cache::coordinator::{Claim, FetchCoordinator, FetchOutcome, SharedFetch};
use crate::cache::{CacheEntry, CacheStats, NodeHandle, RecencyList, StatsRecorder};
use crate::error::{CacheError, Result};
use crate::fetcher::Fetcher;

// == Cache Settings ==
/// Construction parameters, fixed for the lifetime of a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
///
/// Only [`CacheSettings::new`] builds one, so every instance has a non-zero
/// capacity, ttl and fetch timeout.
pub struct CacheSettings {
    max_entries: usize,
    ttl: Duration,
    fetch_timeout: Duration,
    backend: Option<String>,
}

impl CacheSettings {
    /// Creates settings, rejecting a zero capacity, ttl or fetch timeout.
    pub fn new(max_entries: usize, ttl: Duration, fetch_timeout: Duration) -> Result<Self> {
        if max_entries == 0 {
            return Err(CacheError::InvalidRequest(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        if ttl.is_zero() {
            return Err(CacheError::InvalidRequest(
                "ttl must be greater than zero".to_string(),
            ));
        }
        if fetch_timeout.is_zero() {
            return Err(CacheError::InvalidRequest(
                "fetch_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            max_entries,
            ttl,
            fetch_timeout,
            backend: None,
        })
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Maximum number of entries the cache holds
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// How long an entry stays fresh after its fetch completes
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// How long a fetch may stay in flight before it is considered abandoned
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Backing store address handed to the fetcher unchanged
    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }
}

// == Index ==
/// Key lookup plus recency order. One list node per indexed key.
struct Index<V> {
    entries: HashMap<String, NodeHandle>,
    recency: RecencyList<Arc<CacheEntry<V>>>,
}

impl<V> Index<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyList::new(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn lookup(&self, key: &str) -> Result<Option<Arc<CacheEntry<V>>>> {
        let Some(&handle) = self.entries.get(key) else {
            return Ok(None);
        };
        match self.recency.get(handle) {
            Some(entry) if entry.key() == key => Ok(Some(Arc::clone(entry))),
            _ => Err(CacheError::MalformedEntry(key.to_string())),
        }
    }

    /// Handle of the node holding exactly this entry, if it is still indexed.
    fn handle_of(&self, entry: &Arc<CacheEntry<V>>) -> Option<NodeHandle> {
        let &handle = self.entries.get(entry.key())?;
        let current = self.recency.get(handle)?;
        Arc::ptr_eq(current, entry).then_some(handle)
    }

    fn insert(&mut self, entry: Arc<CacheEntry<V>>) {
        if let Some(previous) = self.entries.remove(entry.key()) {
            self.recency.remove(previous);
        }
        let key = entry.key().to_string();
        let handle = self.recency.push_front(entry);
        self.entries.insert(key, handle);
        debug_assert_eq!(self.entries.len(), self.recency.len());
    }

    fn remove(&mut self, entry: &Arc<CacheEntry<V>>) -> bool {
        let Some(handle) = self.handle_of(entry) else {
            return false;
        };
        self.entries.remove(entry.key());
        self.recency.remove(handle);
        debug_assert_eq!(self.entries.len(), self.recency.len());
        true
    }

    fn evict_lru(&mut self) -> Option<Arc<CacheEntry<V>>> {
        let (handle, entry) = self.recency.back()?;
        let entry = Arc::clone(entry);
        if self.entries.get(entry.key()) == Some(&handle) {
            self.entries.remove(entry.key());
        }
        self.recency.remove(handle);
        debug_assert_eq!(self.entries.len(), self.recency.len());
        Some(entry)
    }
}

// == Cache ==
/// Bounded, TTL-aware read-through cache in front of a [`Fetcher`].
///
/// Cloning is cheap; clones share the same entries, fetches and statistics.
pub struct Cache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<V> {
    settings: CacheSettings,
    index: RwLock<Index<V>>,
    coordinator: FetchCoordinator<V>,
    fetcher: Arc<dyn Fetcher<V>>,
    stats: StatsRecorder,
}

impl<V> Cache<V>
where
    V: Send + Sync + 'static,
{
    // == Constructor ==
    pub fn new<F>(settings: CacheSettings, fetcher: F) -> Self
    where
        F: Fetcher<V> + 'static,
    {
        Self::with_fetcher(settings, Arc::new(fetcher))
    }

    pub fn with_fetcher(settings: CacheSettings, fetcher: Arc<dyn Fetcher<V>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                coordinator: FetchCoordinator::new(settings.fetch_timeout()),
                settings,
                index: RwLock::new(Index::new()),
                fetcher,
                stats: StatsRecorder::default(),
            }),
        }
    }

    // == Get ==
    /// Returns the entry for `key`, fetching it on a miss or when stale.
    ///
    /// `Ok(None)` means the backing store does not have the key. Absence is
    /// not cached.
    pub async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry<V>>>> {
        let cached = self.inner.index.read().await.lookup(key)?;

        let Some(entry) = cached else {
            debug!(key, "cache miss");
            self.inner.stats.record_miss();
            return self.fetch(key).await;
        };

        if entry.is_fresh() {
            debug!(key, "cache hit");
            self.inner.stats.record_hit();
            self.inner.promote(&entry).await;
            return Ok(Some(entry));
        }

        debug!(key, "cached entry is stale");
        self.inner.stats.record_miss();
        self.inner.remove(&entry).await;
        self.fetch(key).await
    }

    // == Fetch ==
    /// Loads `key` from the backing store, sharing any fetch already in
    /// flight for it.
    pub async fn fetch(&self, key: &str) -> Result<Option<Arc<CacheEntry<V>>>> {
        let claim = self
            .inner
            .coordinator
            .claim(key, |id| self.spawn_fetch(key, id))
            .await;

        match claim {
            Claim::Leader(outcome) => outcome.await,
            Claim::Follower {
                id,
                outcome,
                deadline,
            } => {
                debug!(key, "joining in-flight fetch");
                self.inner.stats.record_coalesced();
                match time::timeout_at(deadline, outcome).await {
                    Ok(result) => result,
                    Err(_) => {
                        self.inner.coordinator.finish(key, id).await;
                        Err(self.inner.abandoned(key))
                    }
                }
            }
            Claim::Abandoned => Err(self.inner.abandoned(key)),
        }
    }

    // == Remove Element ==
    /// Removes exactly this entry from the cache.
    ///
    /// Returns false if it was already evicted or replaced by a newer entry
    /// for the same key, in which case nothing changes.
    pub async fn remove_element(&self, entry: &Arc<CacheEntry<V>>) -> bool {
        self.inner.remove(entry).await
    }

    /// Checks for an entry without promoting it or checking freshness.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.index.read().await.entries.contains_key(key)
    }

    /// Cached keys from most to least recently used.
    pub async fn keys(&self) -> Vec<String> {
        let index = self.inner.index.read().await;
        index
            .recency
            .iter()
            .map(|entry| entry.key().to_string())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of keys with a fetch in flight.
    pub async fn in_flight(&self) -> usize {
        self.inner.coordinator.len().await
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let total_entries = self.len().await;
        self.inner.stats.snapshot(total_entries)
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.inner.settings
    }

    /// Runs the fetch for `key` on its own task and returns a shareable
    /// handle on its outcome.
    ///
    /// The task stores the result and clears the in-flight marker whether or
    /// not anyone is still waiting for it.
    fn spawn_fetch(&self, key: &str, id: u64) -> SharedFetch<V> {
        let inner = Arc::clone(&self.inner);
        let task_key = key.to_string();
        let task = tokio::spawn(async move { inner.run_fetch(task_key, id).await });

        let inner = Arc::clone(&self.inner);
        let key = key.to_string();
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(key, error = %err, "fetch task did not complete");
                    inner.stats.record_fetch_error();
                    inner.coordinator.finish(&key, id).await;
                    Err(CacheError::FetchFailed {
                        key,
                        reason: format!("fetch task did not complete: {err}"),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl<V> Inner<V>
where
    V: Send + Sync + 'static,
{
    async fn run_fetch(&self, key: String, id: u64) -> FetchOutcome<V> {
        let outcome = self.load(&key).await;
        self.coordinator.finish(&key, id).await;
        outcome
    }

    async fn load(&self, key: &str) -> FetchOutcome<V> {
        // A fetch that completed just before this one was claimed may already
        // have stored the key.
        if let Ok(Some(entry)) = self.index.read().await.lookup(key) {
            if entry.is_fresh() {
                return Ok(Some(entry));
            }
        }

        self.stats.record_fetch();
        match self.fetcher.fetch(key, self.settings.backend()).await {
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(key, error = %reason, "fetch failed");
                self.stats.record_fetch_error();
                Err(CacheError::FetchFailed {
                    key: key.to_string(),
                    reason,
                })
            }
            Ok(None) => {
                debug!(key, "key not found upstream");
                Ok(None)
            }
            Ok(Some(value)) => {
                let entry = Arc::new(CacheEntry::new(key, value, self.settings.ttl()));
                self.insert(Arc::clone(&entry)).await;
                Ok(Some(entry))
            }
        }
    }

    async fn insert(&self, entry: Arc<CacheEntry<V>>) {
        let mut index = self.index.write().await;
        index.insert(entry);

        while index.len() > self.settings.max_entries() {
            let Some(evicted) = index.evict_lru() else {
                break;
            };
            info!(
                key = evicted.key(),
                max_entries = self.settings.max_entries(),
                "evicted least recently used entry"
            );
            self.stats.record_eviction();
        }
    }

    async fn promote(&self, entry: &Arc<CacheEntry<V>>) {
        let mut index = self.index.write().await;
        if let Some(handle) = index.handle_of(entry) {
            index.recency.move_to_front(handle);
        }
    }

    async fn remove(&self, entry: &Arc<CacheEntry<V>>) -> bool {
        let removed = self.index.write().await.remove(entry);
        if removed {
            debug!(key = entry.key(), "purged entry");
        }
        removed
    }

    fn abandoned(&self, key: &str) -> CacheError {
        let timeout = self.coordinator.timeout();
        warn!(key, ?timeout, "in-flight fetch exceeded fetch timeout");
        self.stats.record_abandoned();
        CacheError::FetchAbandoned {
            key: key.to_string(),
            timeout,
        }
    }
}
