//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use caching_proxy::config::ProxyConfig;
use caching_proxy::http::HttpServer;
use caching_proxy::lifecycle::Shutdown;
use caching_proxy::MemoryCache;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

/// Counts how many requests reached a mock upstream.
#[derive(Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn start_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Hand every accepted socket to `handler`, for upstreams that must
/// misbehave at the transport level.
pub async fn start_raw_upstream<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(handler(socket));
        }
    });
    addr
}

/// Read from `socket` until the end of a request head.
pub async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        head.extend_from_slice(&buf[..n]);
    }
}

/// A local address nothing is listening on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Start the proxy in front of `target_url` with the given cache.
pub async fn start_proxy(target_url: &str, cache: Arc<MemoryCache>) -> (SocketAddr, Shutdown) {
    start_proxy_with(proxy_config(target_url), cache).await
}

/// Test defaults: ephemeral port, short drain.
pub fn proxy_config(target_url: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.target_url = target_url.to_string();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.shutdown_secs = 1;
    config
}

/// Start the proxy with an explicit configuration.
pub async fn start_proxy_with(config: ProxyConfig, cache: Arc<MemoryCache>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::with_cache(config, cache);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// A cache roomy enough that header overhead never blocks a test response.
pub fn roomy_cache(ttl: Duration) -> Arc<MemoryCache> {
    Arc::new(MemoryCache::new(ttl, 1024 * 1024, 64 * 1024))
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
