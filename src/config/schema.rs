//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Upstream origin every request is forwarded to.
    pub target_url: String,

    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Response cache sizing and TTL.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            target_url: "http://example.com".to_string(),
            listener: ListenerConfig::default(),
            cache: CacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a stored response in seconds.
    pub ttl_secs: u64,

    /// Total bytes the cache may hold.
    pub max_size: usize,

    /// Largest single record accepted, in bytes.
    pub max_record_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30,
            max_size: 1024 * 1024,
            max_record_size: 1024,
        }
    }
}

/// Timeout configuration for the server and the upstream client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed to receive a request head, in seconds.
    pub read_secs: u64,

    /// Deadline for producing a response, in seconds.
    pub write_secs: u64,

    /// Keep-alive connections idle this long are closed, in seconds.
    pub idle_secs: u64,

    /// Time allowed for in-flight connections to drain on shutdown.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            read_secs: 10,
            write_secs: 30,
            idle_secs: 60,
            shutdown_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.target_url, "http://example.com");
        assert_eq!(config.cache.ttl_secs, 30);
        assert_eq!(config.cache.max_size, 1024 * 1024);
        assert_eq!(config.cache.max_record_size, 1024);
        assert_eq!(config.timeouts.shutdown_secs, 10);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            target_url = "http://origin.internal:3000/api"

            [cache]
            ttl_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.target_url, "http://origin.internal:3000/api");
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.cache.max_record_size, 1024);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
