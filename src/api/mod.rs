//! API Module
//!
//! HTTP front end for the caching proxy.
//!
//! # Endpoints
//! - `GET /_health` - Health check endpoint
//! - `GET /_stats` - Cache statistics
//! - `GET /<key>` - Read-through lookup of `<key>`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
