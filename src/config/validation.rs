//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream URL is usable as a base
//! - Validate value ranges (sizes and timeouts > 0, record ≤ cache)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("target_url {0:?} is not an absolute http(s) URL")]
    InvalidTargetUrl(String),
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),
    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("cache.max_record_size ({record}) exceeds cache.max_size ({total})")]
    RecordLargerThanCache { record: usize, total: usize },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let target_ok = Url::parse(&config.target_url)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false);
    if !target_ok {
        errors.push(ValidationError::InvalidTargetUrl(config.target_url.clone()));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let positive = [
        ("listener.max_connections", config.listener.max_connections as u64),
        ("cache.ttl_secs", config.cache.ttl_secs),
        ("cache.max_size", config.cache.max_size as u64),
        ("cache.max_record_size", config.cache.max_record_size as u64),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.read_secs", config.timeouts.read_secs),
        ("timeouts.write_secs", config.timeouts.write_secs),
        ("timeouts.idle_secs", config.timeouts.idle_secs),
        ("timeouts.shutdown_secs", config.timeouts.shutdown_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.cache.max_record_size > config.cache.max_size {
        errors.push(ValidationError::RecordLargerThanCache {
            record: config.cache.max_record_size,
            total: config.cache.max_size,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
