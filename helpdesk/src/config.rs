//! Configuration management for the helpdesk.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::session::StaticSessionResolver;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default polling interval of the ticket list
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

const SSL_MODES: [&str; 6] = ["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];

/// Malformed configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` configuration, `None` to keep tickets in memory
    pub database: Option<DatabaseConfig>,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Bearer tokens accepted by the server
    pub sessions: StaticSessionResolver,
    /// Ticket list polling
    pub polling: PollingConfig,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// SSL mode: disable, prefer, require (default: prefer)
    pub ssl_mode: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Prometheus scrape port, metrics disabled when unset
    pub metrics_port: Option<u16>,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

impl ServerConfig {
    /// Address the HTTP server binds to
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `HOST` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::invalid("HOST", format!("{e}")))
    }

    /// Address the metrics endpoint binds to, if enabled
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `HOST` is not an IP address.
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.metrics_port
            .map(|port| {
                format!("{}:{port}", self.host)
                    .parse()
                    .map_err(|e| ConfigError::invalid("HOST", format!("{e}")))
            })
            .transpose()
    }
}

/// Ticket list polling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between polls, measured from mount
    pub interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown `DATABASE_SSL_MODE` or a
    /// malformed `HELPDESK_SESSIONS` entry.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            Some(url) => {
                let ssl_mode = lookup("DATABASE_SSL_MODE").unwrap_or_else(|| "prefer".to_string());
                if !SSL_MODES.contains(&ssl_mode.as_str()) {
                    return Err(ConfigError::invalid(
                        "DATABASE_SSL_MODE",
                        format!("unknown mode {ssl_mode:?}"),
                    ));
                }

                Some(DatabaseConfig {
                    url,
                    max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10),
                    min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 1),
                    connect_timeout: parse_or(&lookup, "DATABASE_CONNECT_TIMEOUT", 30),
                    ssl_mode,
                })
            },
            None => None,
        };

        let sessions = match lookup("HELPDESK_SESSIONS") {
            Some(spec) => StaticSessionResolver::parse(&spec)?,
            None => StaticSessionResolver::default(),
        };

        Ok(Self {
            database,
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8080),
                metrics_port: lookup("METRICS_PORT").and_then(|s| s.parse().ok()),
                shutdown_timeout: parse_or(&lookup, "SHUTDOWN_TIMEOUT", 30),
            },
            sessions,
            polling: PollingConfig {
                interval: Duration::from_secs(parse_or(
                    &lookup,
                    "POLL_INTERVAL_SECS",
                    DEFAULT_POLL_INTERVAL.as_secs(),
                )),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.metrics_port, None);
        assert_eq!(config.server.shutdown_timeout, 30);
        assert_eq!(config.polling, PollingConfig::default());
        assert!(config.sessions.is_empty());
    }

    #[test]
    fn database_settings_are_read() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/helpdesk"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("DATABASE_SSL_MODE", "disable"),
            ("POLL_INTERVAL_SECS", "3"),
        ]))
        .unwrap();

        let database = config.database.unwrap();
        assert_eq!(database.max_connections, 4);
        assert_eq!(database.min_connections, 1);
        assert_eq!(database.ssl_mode, "disable");
        assert_eq!(config.polling.interval, Duration::from_secs(3));
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn unknown_ssl_mode_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/helpdesk"),
            ("DATABASE_SSL_MODE", "sometimes"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "DATABASE_SSL_MODE", .. })
        ));
    }

    #[test]
    fn metrics_addr_uses_host() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("METRICS_PORT", "9090"),
        ]))
        .unwrap();
        assert_eq!(
            config.server.metrics_addr().unwrap(),
            Some("127.0.0.1:9090".parse().unwrap())
        );
    }
}
