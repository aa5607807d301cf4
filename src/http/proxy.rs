//! Caching proxy handler.
//!
//! # Flow
//! ```text
//! LOOKUP (GET only) ──hit──▶ replay stored status, headers, body
//!    │ miss
//!    ▼
//! DISPATCH  compose upstream URL, strip hop-by-hop headers, call upstream
//!    ▼
//! RELAY     buffer the whole body, strip hop-by-hop headers
//!    ▼
//! MAYBE_STORE  policy check, copy into a CacheRecord, write to the store
//! ```
//!
//! # Design Decisions
//! - Every failure before the body is fully read answers 502; no retries
//! - The upstream call is awaited inside the handler future, so a client
//!   disconnect drops (cancels) it
//! - Missing the `write_secs` deadline cancels the upstream call and
//!   answers 502 like any other upstream failure
//! - The cache lock is taken only inside `get`/`set`, never across I/O

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{CONTENT_TYPE, HOST},
        HeaderMap, Method, Request, StatusCode,
    },
    response::{IntoResponse, Response},
};

use crate::cache::{cache_key, can_cache, CacheRecord};
use crate::http::headers::strip_hop_by_hop;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::http::uri::{join_url, JoinError};
use crate::observability::metrics;

/// Body of every 502 produced by the proxy.
pub const BAD_GATEWAY_BODY: &str = "failed to handle request";

/// Failure while exchanging a request with the upstream.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("failed to join target url and request path: {0}")]
    Join(#[from] JoinError),
    #[error("failed to create upstream request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("request to upstream failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read upstream response body: {0}")]
    Body(#[source] axum::Error),
    #[error("upstream exchange did not finish within {0:?}")]
    Timeout(Duration),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_GATEWAY,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            BAD_GATEWAY_BODY,
        )
            .into_response()
    }
}

/// A fully buffered, sanitized upstream response.
struct Relayed {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// Main proxy handler.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let key = cache_key(&method, request.uri());
    let request_id = request_id(request.headers()).to_string();

    if method == Method::GET {
        if let Some(record) = state.cache.get(&key) {
            tracing::debug!(
                request_id = %request_id,
                key = %key,
                status = %record.status,
                "Request served from the cache"
            );
            metrics::record_request(method.as_str(), record.status.as_u16(), "cache", start);
            return build_response(record.status, record.headers.clone(), record.body.clone());
        }
        tracing::debug!(request_id = %request_id, key = %key, "Cache miss");
    }

    // Dropping `forward` on the deadline cancels the in-flight upstream call.
    let outcome = tokio::time::timeout(state.request_timeout, forward(&state, request))
        .await
        .unwrap_or_else(|_| Err(ProxyError::Timeout(state.request_timeout)));

    let relayed = match outcome {
        Ok(relayed) => relayed,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream exchange failed");
            metrics::record_request(method.as_str(), StatusCode::BAD_GATEWAY.as_u16(), "error", start);
            return e.into_response();
        }
    };

    metrics::record_request(method.as_str(), relayed.status.as_u16(), "upstream", start);

    if can_cache(&method, relayed.status, &relayed.headers) {
        let record = CacheRecord::new(relayed.status, relayed.headers.clone(), &relayed.body);
        let size = record.size();
        match state.cache.set(key.as_str(), record) {
            Ok(()) => tracing::debug!(request_id = %request_id, key = %key, size, "Request cached"),
            Err(e) => tracing::debug!(request_id = %request_id, key = %key, error = %e, "Failed to cache request"),
        }
    }

    tracing::debug!(request_id = %request_id, status = %relayed.status, "Successfully proxied the request");
    build_response(relayed.status, relayed.headers, relayed.body)
}

/// DISPATCH and RELAY: send the request upstream and buffer the answer.
async fn forward(state: &AppState, request: Request<Body>) -> Result<Relayed, ProxyError> {
    let (parts, body) = request.into_parts();

    let request_target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = join_url(request_target, &state.target_url)?;

    // The inbound request is consumed here; its headers are ours to rewrite.
    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    // The client derives Host from the upstream URL.
    headers.remove(HOST);

    let mut outbound = Request::builder()
        .method(parts.method)
        .uri(url.clone())
        .body(body)?;
    *outbound.headers_mut() = headers;

    tracing::debug!(method = %outbound.method(), url = %url, "Prepared outbound request");

    let response = state.client.request(outbound).await?;
    let (mut upstream, incoming) = response.into_parts();

    let body = axum::body::to_bytes(Body::new(incoming), usize::MAX)
        .await
        .map_err(ProxyError::Body)?;

    strip_hop_by_hop(&mut upstream.headers);

    Ok(Relayed {
        status: upstream.status,
        headers: upstream.headers,
        body,
    })
}

fn build_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
