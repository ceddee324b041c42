//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache and the proxy in front of it.
///
/// `Clone` because a single fetch outcome is handed to every caller that
/// coalesced onto it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// An in-flight fetch for the key outlived the fetch timeout
    #[error("Timeout fetching {key}: in-flight fetch exceeded {timeout:?}")]
    FetchAbandoned { key: String, timeout: Duration },

    /// The backing store reported an error
    #[error("Failed to fetch {key}: {reason}")]
    FetchFailed { key: String, reason: String },

    /// The index points at a node that holds no entry for the key
    #[error("Malformed cache entry for key {0}")]
    MalformedEntry(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// HTTP status used when the error is rendered by the proxy.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::FetchAbandoned { .. } => StatusCode::GATEWAY_TIMEOUT,
            CacheError::FetchFailed { .. } => StatusCode::BAD_GATEWAY,
            CacheError::MalformedEntry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, CacheError>;
