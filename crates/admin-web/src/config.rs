//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use kidoo_database::Database;

/// Admin server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// Emit JSON log lines.
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ADMIN_ADDR` | Server bind address | `127.0.0.1:8788` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:kidoo.db?mode=rwc` |
    /// | `DB_POOL_SIZE` | Connection pool size | `20` |
    /// | `LOG_JSON` | JSON log output | `false` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup("ADMIN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8788".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            lookup("SQLITE_PATH").unwrap_or_else(|| "sqlite:kidoo.db?mode=rwc".to_string());

        let pool_size = match lookup("DB_POOL_SIZE") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidPoolSize(raw)),
            },
            None => Database::DEFAULT_POOL_SIZE,
        };

        let log_json = match lookup("LOG_JSON").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => return Err(ConfigError::InvalidLogJson(other.to_string())),
        };

        Ok(Self {
            addr,
            database_url,
            pool_size,
            log_json,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ADMIN_ADDR format")]
    InvalidAddr,

    #[error("DB_POOL_SIZE must be a positive integer, got {0:?}")]
    InvalidPoolSize(String),

    #[error("LOG_JSON must be true or false, got {0:?}")]
    InvalidLogJson(String),
}
