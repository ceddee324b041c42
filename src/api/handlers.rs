//! API Handlers
//!
//! HTTP request handlers for the proxy endpoints.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    Json,
};
use tracing::debug;

use crate::cache::{Cache, MAX_KEY_LENGTH};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::fetcher::RedisFetcher;
use crate::models::{GetResponse, HealthResponse, StatsResponse};

/// Application state shared across all handlers.
///
/// The cache handle is internally reference counted, so cloning the state
/// is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Shared read-through cache
    pub cache: Cache<String>,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: Cache<String>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration, fronting Redis.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Cache::new(config.cache_settings()?, RedisFetcher::default());
        Ok(Self::new(cache))
    }
}

/// Derives the cache key from a request path by stripping the leading `/`.
pub fn key_from_path(path: &str) -> Result<&str> {
    let key = path.strip_prefix('/').unwrap_or(path);

    if key.is_empty() {
        return Err(CacheError::InvalidRequest(
            "Key cannot be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(key)
}

/// Handler for every path not claimed by another route.
///
/// Looks the key up through the cache. Absent keys answer 404 with a null
/// value; cache errors render through [`CacheError`]'s response mapping.
pub async fn proxy_handler(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<(StatusCode, Json<GetResponse<String>>)> {
    let key = key_from_path(uri.path())?;
    debug!(key, "received request");

    match state.cache.get(key).await? {
        Some(entry) => Ok((StatusCode::OK, Json(GetResponse::found(&entry)))),
        None => {
            debug!(key, "no value upstream");
            Ok((StatusCode::NOT_FOUND, Json(GetResponse::absent(key))))
        }
    }
}

/// Handler for GET /_stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

/// Handler for GET /_health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
