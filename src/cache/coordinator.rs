//! Fetch Coordinator Module
//!
//! Tracks in-flight backing-store fetches per key so that concurrent misses
//! on the same key share one fetch.
//!
//! Each marker holds the fetch's start time and a [`Shared`] handle on its
//! outcome. The first caller for a key starts the fetch and becomes the
//! leader; later callers join as followers until the marker is older than the
//! fetch timeout, after which the fetch is treated as abandoned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cache::CacheEntry;
use crate::error::Result;

/// Result of one fetch, handed to every caller waiting on it.
pub(crate) type FetchOutcome<V> = Result<Option<Arc<CacheEntry<V>>>>;

/// Clonable handle on a fetch that is running in its own task.
pub(crate) type SharedFetch<V> = Shared<BoxFuture<'static, FetchOutcome<V>>>;

struct InFlight<V> {
    id: u64,
    started_at: Instant,
    outcome: SharedFetch<V>,
}

// == Claim ==
/// What a caller should do after consulting the in-flight table.
pub(crate) enum Claim<V> {
    /// No fetch was running; this caller started one.
    Leader(SharedFetch<V>),
    /// A fetch is running; wait for it, but not past `deadline`.
    Follower {
        id: u64,
        outcome: SharedFetch<V>,
        deadline: Instant,
    },
    /// A fetch was running for longer than the timeout. Its marker has been
    /// dropped so the next caller starts over.
    Abandoned,
}

// == Fetch Coordinator ==
pub(crate) struct FetchCoordinator<V> {
    in_flight: Mutex<HashMap<String, InFlight<V>>>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl<V> FetchCoordinator<V> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            timeout,
        }
    }

    // == Claim ==
    /// Joins the in-flight fetch for `key`, or starts one with `start`.
    ///
    /// `start` runs under the table lock and receives the id of the new
    /// fetch; it must not block.
    pub async fn claim<F>(&self, key: &str, start: F) -> Claim<V>
    where
        F: FnOnce(u64) -> SharedFetch<V>,
    {
        let now = Instant::now();
        let mut in_flight = self.in_flight.lock().await;

        if let Some(existing) = in_flight.get(key) {
            if now.saturating_duration_since(existing.started_at) <= self.timeout {
                return Claim::Follower {
                    id: existing.id,
                    outcome: existing.outcome.clone(),
                    deadline: existing.started_at + self.timeout,
                };
            }
            in_flight.remove(key);
            return Claim::Abandoned;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let outcome = start(id);
        in_flight.insert(
            key.to_string(),
            InFlight {
                id,
                started_at: now,
                outcome: outcome.clone(),
            },
        );
        Claim::Leader(outcome)
    }

    // == Finish ==
    /// Drops the marker for `key` if it still belongs to fetch `id`.
    ///
    /// A fetch that was declared abandoned and replaced must not clear the
    /// marker of its successor.
    pub async fn finish(&self, key: &str, id: u64) -> bool {
        let mut in_flight = self.in_flight.lock().await;
        match in_flight.get(key) {
            Some(existing) if existing.id == id => {
                in_flight.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Number of keys with an outstanding fetch.
    pub async fn len(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
