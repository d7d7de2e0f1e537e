//! PostgreSQL dataset index adapter

pub mod config;
pub mod index;
pub mod migrations;

pub use config::{ConfigError, PoolConfig, PostgresConfig};
pub use migrations::{MigrationError, MigrationManager};

use eeindex_core::error::{IndexerError, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// PostgreSQL-backed dataset index
pub struct PostgresIndex {
    pool: PgPool,
}

impl PostgresIndex {
    /// Connect to the database described by `config`
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| IndexerError::config("database_url", e.to_string()))?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                IndexerError::IndexUnavailable(format!("failed to connect to database: {}", e))
            })?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| IndexerError::IndexUnavailable(format!("connection test failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date
    pub async fn with_migrations(config: PostgresConfig) -> Result<Self> {
        let index = Self::new(config).await?;
        index.run_migrations().await?;
        Ok(index)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        let manager = MigrationManager::new(self.pool.clone());
        manager
            .run_migrations()
            .await
            .map_err(|e| IndexerError::IndexUnavailable(format!("migration failed: {}", e)))?;
        info!("Index schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
