//! Application configuration loaded from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use dispatch::DispatchConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL URL; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `METRICS_ADDR`: Prometheus listener (default: `0.0.0.0:9000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DISPATCH_TIMEOUT_SECS`: collaborator call timeout (default: `5`)
/// - `DISPATCH_QUEUE_CAPACITY`: side-effect queue size (default: `1024`)
/// - `NOTIFICATIONS_ENABLED`: (default: `true`)
/// - `STOCK_ADJUSTMENT_ENABLED`: (default: `true`)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub metrics_addr: SocketAddr,
    pub log_level: String,
    pub log_format: LogFormat,
    pub dispatch: DispatchConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(true),
                    "false" | "0" | "no" | "off" => Some(false),
                    _ => None,
                })
                .unwrap_or(default)
        };

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            metrics_addr: parse_var(&lookup, "METRICS_ADDR").unwrap_or(defaults.metrics_addr),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            dispatch: DispatchConfig {
                call_timeout: parse_var(&lookup, "DISPATCH_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.dispatch.call_timeout),
                queue_capacity: parse_var(&lookup, "DISPATCH_QUEUE_CAPACITY")
                    .filter(|capacity: &usize| *capacity > 0)
                    .unwrap_or(defaults.dispatch.queue_capacity),
                notifications_enabled: flag(
                    "NOTIFICATIONS_ENABLED",
                    defaults.dispatch.notifications_enabled,
                ),
                stock_adjustment_enabled: flag(
                    "STOCK_ADJUSTMENT_ENABLED",
                    defaults.dispatch.stock_adjustment_enabled,
                ),
            },
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 5,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            dispatch: DispatchConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.metrics_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.dispatch.call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]);
        assert!(config.database_url.is_none());
        assert_eq!(config.dispatch.queue_capacity, 1024);
        assert!(config.dispatch.notifications_enabled);
    }

    #[test]
    fn test_reads_every_variable() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("METRICS_ADDR", "127.0.0.1:9100"),
            ("RUST_LOG", "debug"),
            ("LOG_FORMAT", "JSON"),
            ("DISPATCH_TIMEOUT_SECS", "2"),
            ("DISPATCH_QUEUE_CAPACITY", "64"),
            ("NOTIFICATIONS_ENABLED", "false"),
            ("STOCK_ADJUSTMENT_ENABLED", "0"),
        ]);

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.database_max_connections, 12);
        assert_eq!(config.metrics_addr.to_string(), "127.0.0.1:9100");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.dispatch.call_timeout, Duration::from_secs(2));
        assert_eq!(config.dispatch.queue_capacity, 64);
        assert!(!config.dispatch.notifications_enabled);
        assert!(!config.dispatch.stock_adjustment_enabled);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("DATABASE_URL", "  "),
            ("DATABASE_MAX_CONNECTIONS", "many"),
            ("METRICS_ADDR", "nowhere"),
            ("DISPATCH_QUEUE_CAPACITY", "0"),
            ("NOTIFICATIONS_ENABLED", "maybe"),
        ]);

        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.metrics_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.dispatch.queue_capacity, 1024);
        assert!(config.dispatch.notifications_enabled);
    }
}
