//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! GET request
//!     → store.rs (lookup by "METHOD:path?query", lazy TTL expiry)
//!     → hit: replay stored status, headers, body
//!
//! Upstream response
//!     → policy.rs (method, status, Cache-Control)
//!     → record.rs (copy body + sanitized headers, compute byte cost)
//!     → store.rs (admit, evict least-recently-used until it fits)
//! ```
//!
//! # Design Decisions
//! - One store instance per server, shared via Arc, never global
//! - Whole store is a single critical section; no I/O under the lock
//! - Expired entries are reclaimed on lookup, no background sweeper
//! - Capacity is accounted in bytes, not entries

pub mod policy;
pub mod record;
pub mod store;


pub use policy::can_cache;
pub use record::CacheRecord;
pub use store::{CacheError, MemoryCache};

use axum::http::{Method, Uri};

/// Build the cache key for a request: method plus path and query.
pub fn cache_key(method: &Method, uri: &Uri) -> String {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}:{}", method, target)
}
