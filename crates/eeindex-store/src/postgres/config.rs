//! PostgreSQL configuration

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Connection settings for the PostgreSQL index
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub pool: PoolConfig,
}

impl PostgresConfig {
    /// `DATABASE_URL`, plus `EEINDEX_DB_MAX_CONNECTIONS` when set
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?;
        if database_url.trim().is_empty() {
            return Err(invalid("DATABASE_URL", "cannot be empty"));
        }

        let mut pool = PoolConfig::default();
        if let Ok(raw) = std::env::var("EEINDEX_DB_MAX_CONNECTIONS") {
            pool.max_connections = raw
                .trim()
                .parse()
                .map_err(|_| invalid("EEINDEX_DB_MAX_CONNECTIONS", format!("'{}' is not a number", raw)))?;
            pool.min_connections = pool.min_connections.min(pool.max_connections);
        }

        let config = Self { database_url, pool };
        config.validate()?;
        Ok(config)
    }

    pub fn new(database_url: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            database_url: database_url.into(),
            pool: PoolConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(invalid("database_url", "cannot be empty"));
        }
        self.pool.validate()
    }
}

/// Connection pool sizing and timeouts
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 2,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.min_connections, self.max_connections) {
            (_, 0) => Err(invalid("pool.max_connections", "must be greater than 0")),
            (min, max) if min > max => Err(invalid(
                "pool.min_connections",
                format!("{} exceeds max_connections ({})", min, max),
            )),
            _ => Ok(()),
        }
    }
}
