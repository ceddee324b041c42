//! Cache behaviour scenarios driven through the public API.
//!
//! Time is paused so TTL arithmetic is exact.

use std::sync::Arc;
use std::time::Duration;

use cache_proxy::cache::{Cache, CacheSettings};
use cache_proxy::error::CacheError;
use cache_proxy::fetcher::MapFetcher;

// == Helper Functions ==

fn fixture() -> MapFetcher<String> {
    ["foo", "bar", "wip", "zoz"]
        .into_iter()
        .map(|k| (k, k.to_string()))
        .collect()
}

fn settings(max_entries: usize) -> CacheSettings {
    CacheSettings::new(max_entries, Duration::from_secs(3), Duration::from_secs(1)).unwrap()
}

async fn value_of(cache: &Cache<String>, key: &str) -> String {
    cache
        .get(key)
        .await
        .unwrap()
        .map(|entry| entry.value().clone())
        .unwrap()
}

// == Capacity ==

#[tokio::test(start_paused = true)]
async fn test_fourth_key_evicts_least_recently_used() {
    let fetcher = fixture();
    let cache = Cache::new(settings(3), fetcher.clone());

    for key in ["foo", "bar", "wip"] {
        assert_eq!(value_of(&cache, key).await, key);
    }
    assert_eq!(cache.len().await, 3);

    assert_eq!(value_of(&cache, "zoz").await, "zoz");
    assert_eq!(cache.len().await, 3);
    assert!(!cache.contains("foo").await);
    assert_eq!(cache.stats().await.evictions, 1);

    assert_eq!(value_of(&cache, "foo").await, "foo");
    assert_eq!(fetcher.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_recent_hit_survives_eviction() {
    let fetcher = fixture();
    let cache = Cache::new(settings(3), fetcher.clone());

    for key in ["foo", "bar", "wip"] {
        value_of(&cache, key).await;
    }
    value_of(&cache, "foo").await;
    value_of(&cache, "zoz").await;

    assert_eq!(cache.keys().await, vec!["zoz", "foo", "wip"]);
    assert_eq!(fetcher.calls(), 4);
}

// == Freshness ==

#[tokio::test(start_paused = true)]
async fn test_ttl_counts_down_then_refetches() {
    let fetcher = fixture();
    let cache = Cache::new(settings(3), fetcher.clone());

    let first = cache.get("foo").await.unwrap().unwrap();
    assert_eq!(first.ttl_remaining(), Duration::from_secs(3));

    tokio::time::sleep(Duration::from_secs(1)).await;

    let second = cache.get("foo").await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.ttl_remaining(), Duration::from_secs(2));
    assert_eq!(fetcher.calls(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!second.is_fresh());

    let third = cache.get("foo").await.unwrap().unwrap();
    assert!(third.is_fresh());
    assert_eq!(third.value(), "foo");
    assert_eq!(fetcher.calls(), 2);
}

// == Single Flight ==

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_share_one_fetch() {
    let fetcher = fixture().with_delay(Duration::from_millis(200));
    let cache = Cache::new(settings(3), fetcher.clone());

    let gets = (0..8).map(|_| {
        let cache = cache.clone();
        async move { cache.get("bar").await }
    });
    let results = futures::future::join_all(gets).await;

    let first = results[0].as_ref().unwrap().as_ref().unwrap();
    for result in &results {
        let entry = result.as_ref().unwrap().as_ref().unwrap();
        assert!(Arc::ptr_eq(first, entry));
    }
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.stats().await.coalesced, 7);
    assert_eq!(cache.in_flight().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_stale_reads_share_one_refetch() {
    let fetcher = fixture();
    let cache = Cache::new(settings(3), fetcher.clone());

    let warm = cache.get("foo").await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    let gets = (0..8).map(|_| {
        let cache = cache.clone();
        async move { cache.get("foo").await }
    });
    let results = futures::future::join_all(gets).await;

    let first = results[0].as_ref().unwrap().as_ref().unwrap();
    assert!(!Arc::ptr_eq(first, &warm));
    for result in &results {
        let entry = result.as_ref().unwrap().as_ref().unwrap();
        assert!(Arc::ptr_eq(first, entry));
    }
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.in_flight().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_abandons_followers() {
    let fetcher = fixture().with_delay(Duration::from_secs(5));
    let cache = Cache::new(settings(3), fetcher.clone());

    let leader = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("wip").await }
    });
    tokio::task::yield_now().await;

    let follower = cache.get("wip").await;
    assert!(matches!(follower, Err(CacheError::FetchAbandoned { .. })));

    // The leader is not bounded by the fetch timeout.
    let entry = leader.await.unwrap().unwrap().unwrap();
    assert_eq!(entry.value(), "wip");
    assert_eq!(fetcher.calls(), 1);
}

// == Removal ==

#[tokio::test(start_paused = true)]
async fn test_remove_element_twice_is_harmless() {
    let cache = Cache::new(settings(3), fixture());

    let entry = cache.get("foo").await.unwrap().unwrap();
    value_of(&cache, "bar").await;

    assert!(cache.remove_element(&entry).await);
    assert!(!cache.remove_element(&entry).await);

    assert_eq!(cache.keys().await, vec!["bar"]);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_absent_key_is_not_cached() {
    let fetcher = fixture();
    let cache = Cache::new(settings(3), fetcher.clone());

    assert!(cache.get("nope").await.unwrap().is_none());
    assert!(cache.get("nope").await.unwrap().is_none());

    assert!(cache.is_empty().await);
    assert_eq!(fetcher.calls(), 2);
}
