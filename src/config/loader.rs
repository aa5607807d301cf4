//! Configuration loading from disk and the environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then
/// validation.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` resolves a variable name to its value; `load_config` passes the
/// process environment.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = lookup("LOGLEVEL") {
        config.observability.log_level = level;
    }
    config.observability.log_level = normalize_log_level(&config.observability.log_level);

    if let Some(port) = lookup("PROXY_LISTENPORT") {
        let port: u16 = port.parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
            var: "PROXY_LISTENPORT",
            value: port.clone(),
            reason: e.to_string(),
        })?;
        let mut addr = config
            .listener
            .bind_address
            .parse::<SocketAddr>()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)));
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }

    if let Some(target) = lookup("PROXY_TARGETURL") {
        config.target_url = target;
    }

    let durations: [(&'static str, &mut u64); 5] = [
        ("PROXY_SHUTDOWNTIMEOUT", &mut config.timeouts.shutdown_secs),
        ("PROXY_SERVER_READTIMEOUT", &mut config.timeouts.read_secs),
        ("PROXY_SERVER_WRITETIMEOUT", &mut config.timeouts.write_secs),
        ("PROXY_SERVER_IDLETIMEOUT", &mut config.timeouts.idle_secs),
        ("CACHE_TTL", &mut config.cache.ttl_secs),
    ];
    for (var, slot) in durations {
        if let Some(value) = lookup(var) {
            *slot = parse_duration(&value)
                .map_err(|reason| ConfigError::Env {
                    var,
                    value: value.clone(),
                    reason,
                })?
                .as_secs();
        }
    }

    let sizes: [(&'static str, &mut usize); 2] = [
        ("CACHE_MAXSIZE", &mut config.cache.max_size),
        ("CACHE_MAXRECORDSIZE", &mut config.cache.max_record_size),
    ];
    for (var, slot) in sizes {
        if let Some(value) = lookup(var) {
            *slot = value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
                var,
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Unknown levels fall back to "info".
fn normalize_log_level(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        level
    } else {
        "info".to_string()
    }
}

/// Parse `30s`, `5m`, `1h` or a bare number of seconds.
fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| "expected a whole number followed by s, m or h".to_string())?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        other => return Err(format!("unsupported unit {other:?}")),
    };

    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| "duration overflows".to_string())
}
