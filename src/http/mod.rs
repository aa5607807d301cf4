//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, Axum router, middleware)
//!     → request.rs (request ID)
//!     → proxy.rs (cache lookup, upstream exchange, cache store)
//!         → uri.rs (upstream URL)
//!         → headers.rs (hop-by-hop removal, both directions)
//!     → Send to client
//! ```

pub mod headers;
pub mod proxy;
pub mod request;
pub mod server;
pub mod uri;

pub use headers::strip_hop_by_hop;
pub use proxy::{ProxyError, BAD_GATEWAY_BODY};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
pub use uri::{join_url, JoinError};
