//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use mizhiwu_db::{DbConfig, LedgerSettings};
use serde::{Deserialize, Serialize};

/// Secret used when `JWT_SECRET` is unset. Never acceptable in production.
pub const DEV_JWT_SECRET: &str = "mizhiwu-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Interface to bind
    pub bind_addr: String,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// First service port handed out on an empty database
    pub base_port: i64,

    /// Invite code cap for new accounts
    pub default_invitecode_num: i64,
}

impl PortalConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = PortalConfig {
            http_port: parse_var("HTTP_PORT", "8000")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./mizhiwu.db".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "5")?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            jwt_access_lifetime_secs: parse_var("JWT_ACCESS_LIFETIME_SECS", "86400")?, // 1 day
            base_port: parse_var("BASE_PORT", "10000")?,
            default_invitecode_num: parse_var("DEFAULT_INVITECODE_NUM", "5")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Configuration for tests: in-memory database, fixed secret.
    pub fn for_tests() -> Self {
        PortalConfig {
            http_port: 0,
            bind_addr: "127.0.0.1".to_string(),
            database_path: ":memory:".to_string(),
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            jwt_access_lifetime_secs: 3600,
            base_port: 10_000,
            default_invitecode_num: 5,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }
        if !(1..=mizhiwu_core::MAX_SERVICE_PORT).contains(&self.base_port) {
            return Err(ConfigError::InvalidValue("BASE_PORT".to_string()));
        }
        if self.default_invitecode_num < 0 {
            return Err(ConfigError::InvalidValue("DEFAULT_INVITECODE_NUM".to_string()));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        Ok(())
    }

    /// Whether the development JWT secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Address the HTTP server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BIND_ADDR".to_string()))
    }

    /// Database pool settings.
    pub fn db_config(&self) -> DbConfig {
        if self.database_path == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
        }
    }

    /// Ledger settings.
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            base_port: self.base_port,
            invitecode_num: self.default_invitecode_num,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_config_is_valid() {
        let config = PortalConfig::for_tests();
        assert!(config.validate().is_ok());
        assert!(!config.uses_dev_secret());
        assert_eq!(config.socket_addr().unwrap().ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_rejects_out_of_range_base_port() {
        let mut config = PortalConfig::for_tests();
        config.base_port = 70_000;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(name)) if name == "BASE_PORT"));
    }

    #[test]
    fn test_rejects_bad_bind_addr() {
        let mut config = PortalConfig::for_tests();
        config.bind_addr = "not an address".to_string();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_ledger_settings_follow_config() {
        let mut config = PortalConfig::for_tests();
        config.base_port = 20_000;
        config.default_invitecode_num = 2;

        let settings = config.ledger_settings();
        assert_eq!(settings.base_port, 20_000);
        assert_eq!(settings.invitecode_num, 2);
    }
}
