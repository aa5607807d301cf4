//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Configure HTTP/1.1 and HTTP/2 support
//! - Wire up middleware (tracing, request ID)
//! - Accept connections with backpressure and per-connection timeouts
//! - Drain connections on shutdown within a deadline

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, routing::any, Router};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
    service::TowerToHyperService,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::cache::MemoryCache;
use crate::config::ProxyConfig;
use crate::http::proxy::proxy_handler;
use crate::http::request::request_id_layer;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upstream base URL.
    pub target_url: Arc<str>,
    pub cache: Arc<MemoryCache>,
    pub client: Client<HttpConnector, Body>,
    /// Deadline for the whole upstream exchange.
    pub request_timeout: Duration,
}

/// Per-connection timeouts derived from the config.
#[derive(Debug, Clone, Copy)]
struct ConnectionTimeouts {
    read: Duration,
    idle: Duration,
}

/// HTTP server for the caching proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    cache: Arc<MemoryCache>,
}

impl HttpServer {
    /// Create a new HTTP server with a cache sized from the configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let cache = Arc::new(MemoryCache::from_config(&config.cache));
        Self::with_cache(config, cache)
    }

    /// Create a new HTTP server around an existing cache.
    pub fn with_cache(config: ProxyConfig, cache: Arc<MemoryCache>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            target_url: Arc::from(config.target_url.as_str()),
            cache: Arc::clone(&cache),
            client,
            request_timeout: Duration::from_secs(config.timeouts.write_secs),
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            cache,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then drain connections.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let listener = Listener::new(listener, self.config.listener.max_connections);
        let addr = listener.local_addr().map_err(ListenerError::LocalAddr)?;
        tracing::info!(
            address = %addr,
            target_url = %self.config.target_url,
            "HTTP server starting"
        );

        let timeouts = ConnectionTimeouts {
            read: Duration::from_secs(self.config.timeouts.read_secs),
            idle: Duration::from_secs(self.config.timeouts.idle_secs),
        };
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(conn) => conn,
                        Err(ListenerError::Closed) => break,
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            continue;
                        }
                    };

                    let guard = tracker.track();
                    let router = self.router.clone();
                    let drain = tracker.drain_receiver();
                    tokio::spawn(async move {
                        let _permit = permit;
                        serve_connection(stream, peer, router, timeouts, guard, drain).await;
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        drop(listener);
        tracker.begin_drain();

        let deadline = Duration::from_secs(self.config.timeouts.shutdown_secs);
        if tokio::time::timeout(deadline, tracker.wait_for_drain()).await.is_err() {
            tracing::warn!(
                open_connections = tracker.active_count(),
                "Shutdown deadline elapsed before all connections drained"
            );
        }

        tracing::info!(cached_entries = self.cache.count(), "HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The response cache shared by all requests.
    pub fn cache(&self) -> &Arc<MemoryCache> {
        &self.cache
    }
}

/// Serve one connection until it closes, is idle too long, or the server drains.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    timeouts: ConnectionTimeouts,
    guard: ConnectionGuard,
    mut drain: watch::Receiver<bool>,
) {
    let activity = guard.activity();
    let service = {
        let activity = activity.clone();
        tower::service_fn(move |request: axum::http::Request<Incoming>| {
            let router = router.clone();
            let busy = activity.begin();
            async move {
                let response = router.oneshot(request).await;
                drop(busy);
                response
            }
        })
    };

    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read);
    builder.http2().timer(TokioTimer::new());

    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), TowerToHyperService::new(service));
    tokio::pin!(conn);

    let mut idle_check = tokio::time::interval(timeouts.idle.min(Duration::from_secs(1)));
    let mut draining = false;

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %guard.id(), peer = %peer, error = %e, "Connection closed with error");
                }
                break;
            }
            _ = idle_check.tick(), if !draining => {
                if activity.idle_for() >= timeouts.idle {
                    tracing::debug!(connection_id = %guard.id(), peer = %peer, "Closing idle connection");
                    conn.as_mut().graceful_shutdown();
                    draining = true;
                }
            }
            _ = drain.changed(), if !draining => {
                conn.as_mut().graceful_shutdown();
                draining = true;
            }
        }
    }
}
