//! In-memory HTTP caching reverse proxy
//!
//! Forwards every request to a single upstream and keeps successful GET
//! responses in a bounded, TTL-governed memory cache.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────┐
//!                  │                 CACHING PROXY                     │
//!                  │                                                   │
//!   Client Request │  ┌─────────┐    ┌─────────┐    ┌──────────────┐  │
//!   ───────────────┼─▶│   net   │───▶│  http   │───▶│ cache lookup │  │
//!                  │  │listener │    │ server  │    └──────┬───────┘  │
//!                  │  └─────────┘    └─────────┘      hit  │  miss    │
//!                  │                                   │   ▼          │
//!   Client Response│                                   │ ┌──────────┐ │
//!   ◀──────────────┼───────────────────────────────────┴─│ upstream │◀┼── Upstream
//!                  │                                     │  client  │ │
//!                  │                                     └──────────┘ │
//!                  │  config · observability · lifecycle              │
//!                  └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use caching_proxy::config::load_config;
use caching_proxy::lifecycle::{signals::wait_for_signal, Shutdown};
use caching_proxy::observability::{logging::init_logging, metrics::init_metrics};
use caching_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "caching-proxy", version, about = "In-memory HTTP caching reverse proxy")]
struct Cli {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.observability.log_level);

    tracing::info!("caching-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        target_url = %config.target_url,
        cache_ttl_secs = config.cache.ttl_secs,
        cache_max_size = config.cache.max_size,
        cache_max_record_size = config.cache.max_record_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        _ = wait_for_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
        result = &mut server_task => {
            result??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
