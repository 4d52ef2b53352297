//! Application configuration structs
//!
//! Loads configuration from environment variables (with `.env` support).
//! Configuration is read once at startup; a missing required key is fatal.

use serde::Deserialize;
use std::env;
use std::time::Duration;

use presence_core::{Identity, Transport};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub roster: RosterConfig,
    pub account: AccountConfig,
    pub timeouts: TimeoutConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Roster table configuration: where identities are read from and where
/// last-known status is written back (write column optional).
#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    pub table: String,
    pub read_column: String,
    #[serde(default)]
    pub write_column: Option<String>,
}

/// The watcher's own account: its identity (used as message sender), the
/// outbound proxy to resolve routes against, and transport preferences.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub identity: String,
    #[serde(default)]
    pub proxy_host: Option<String>,
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,
    #[serde(default)]
    pub proxy_transport: Transport,
    #[serde(default = "default_transports")]
    pub transports: Vec<Transport>,
}

impl AccountConfig {
    /// Parse the configured account identity
    pub fn parsed_identity(&self) -> Result<Identity, ConfigError> {
        Identity::parse(&self.identity, "")
            .map_err(|e| ConfigError::InvalidValue("ACCOUNT_IDENTITY", e.to_string()))
    }
}

/// Protocol operation timeouts
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_subscribe_timeout")]
    pub subscribe_secs: u64,
    #[serde(default = "default_end_timeout")]
    pub end_secs: u64,
}

impl TimeoutConfig {
    #[must_use]
    pub fn subscribe(&self) -> Duration {
        Duration::from_secs(self.subscribe_secs)
    }

    #[must_use]
    pub fn end(&self) -> Duration {
        Duration::from_secs(self.end_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            subscribe_secs: default_subscribe_timeout(),
            end_secs: default_end_timeout(),
        }
    }
}

// Default value functions
fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    5
}

fn default_proxy_port() -> u16 {
    5060
}

fn default_transports() -> Vec<Transport> {
    vec![Transport::Udp, Transport::Tcp, Transport::Tls]
}

fn default_subscribe_timeout() -> u64 {
    5
}

fn default_end_timeout() -> u64 {
    1
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    /// or carry unparseable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database: DatabaseConfig {
                host: env::var("DATABASE_HOST").unwrap_or_else(|_| default_db_host()),
                port: parse_or("DATABASE_PORT", default_db_port())?,
                user: require("DATABASE_USER")?,
                password: require("DATABASE_PASSWORD")?,
                database: require("DATABASE_NAME")?,
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", default_max_connections())?,
            },
            roster: RosterConfig {
                table: require("ROSTER_TABLE")?,
                read_column: require("ROSTER_READ_COLUMN")?,
                write_column: env::var("ROSTER_WRITE_COLUMN").ok().filter(|s| !s.is_empty()),
            },
            account: AccountConfig {
                identity: require("ACCOUNT_IDENTITY")?,
                proxy_host: env::var("PROXY_HOST").ok().filter(|s| !s.is_empty()),
                proxy_port: parse_or("PROXY_PORT", default_proxy_port())?,
                proxy_transport: env::var("PROXY_TRANSPORT")
                    .ok()
                    .map(|s| {
                        s.parse()
                            .map_err(|e: String| ConfigError::InvalidValue("PROXY_TRANSPORT", e))
                    })
                    .transpose()?
                    .unwrap_or_default(),
                transports: env::var("TRANSPORT_PREFERENCES")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|t| !t.is_empty())
                            .map(|t| {
                                t.parse().map_err(|e: String| {
                                    ConfigError::InvalidValue("TRANSPORT_PREFERENCES", e)
                                })
                            })
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .transpose()?
                    .unwrap_or_else(default_transports),
            },
            timeouts: TimeoutConfig {
                subscribe_secs: parse_or("SUBSCRIBE_TIMEOUT_SECS", default_subscribe_timeout())?,
                end_secs: parse_or("END_TIMEOUT_SECS", default_end_timeout())?,
            },
        })
    }
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVar(key))
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_db_host(), "127.0.0.1");
        assert_eq!(default_db_port(), 5432);
        assert_eq!(default_subscribe_timeout(), 5);
        assert_eq!(default_end_timeout(), 1);
        assert_eq!(
            default_transports(),
            vec![Transport::Udp, Transport::Tcp, Transport::Tls]
        );
    }

    #[test]
    fn test_timeout_config_durations() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.subscribe(), Duration::from_secs(5));
        assert_eq!(timeouts.end(), Duration::from_secs(1));
    }

    #[test]
    fn test_account_identity_parsing() {
        let account = AccountConfig {
            identity: "watcher@example.com".to_string(),
            proxy_host: None,
            proxy_port: default_proxy_port(),
            proxy_transport: Transport::default(),
            transports: default_transports(),
        };
        let id = account.parsed_identity().unwrap();
        assert_eq!(id.domain(), "example.com");

        let bad = AccountConfig {
            identity: "@nodomain".to_string(),
            ..account
        };
        assert!(bad.parsed_identity().is_err());
    }
}
