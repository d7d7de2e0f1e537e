use crate::cli::StorageBackend;
use crate::errors::database_connection_failed;
use anyhow::Result;
use eeindex_store::postgres::{PostgresConfig, PostgresIndex};
use eeindex_store::{DatasetIndex, MemoryIndex};
use std::sync::Arc;

/// Host, port and database of a connection URL, for error messages
fn parse_database_url(url: &str) -> (String, String, String) {
    let authority = url
        .split('@')
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("localhost:5432");
    let mut parts = authority.splitn(2, ':');
    let host = parts.next().filter(|h| !h.is_empty()).unwrap_or("localhost").to_string();
    let port = parts.next().unwrap_or("5432").to_string();

    let database = url
        .rsplit('/')
        .next()
        .and_then(|s| s.split('?').next())
        .filter(|s| !s.is_empty() && !s.contains('@'))
        .unwrap_or("eeindex")
        .to_string();

    (host, port, database)
}

pub struct Storage {
    pub index: Arc<dyn DatasetIndex>,
    pub backend: StorageBackend,
}

impl Storage {
    pub async fn new(backend: StorageBackend) -> Result<Self> {
        match backend {
            StorageBackend::Memory => Ok(Self::new_memory()),
            StorageBackend::Postgres => Self::new_postgres().await,
        }
    }

    fn new_memory() -> Self {
        Self {
            index: Arc::new(MemoryIndex::new()),
            backend: StorageBackend::Memory,
        }
    }

    /// Connect and bring the schema up to date
    async fn new_postgres() -> Result<Self> {
        let config =
            PostgresConfig::from_env().map_err(|e| database_connection_failed(&e.to_string()))?;

        let index = PostgresIndex::with_migrations(config.clone()).await.map_err(|e| {
            let (host, port, database) = parse_database_url(&config.database_url);
            database_connection_failed(&e.to_string()).with_context(format!(
                "Failed to connect to PostgreSQL\n\n\
                 Connection details:\n  \
                   Host: {}\n  \
                   Port: {}\n  \
                   Database: {}\n\n\
                 Error: {}",
                host, port, database, e
            ))
        })?;
        tracing::debug!("PostgreSQL index ready");

        Ok(Self {
            index: Arc::new(index),
            backend: StorageBackend::Postgres,
        })
    }

    /// The memory backend starts empty on every invocation
    pub fn is_ephemeral(&self) -> bool {
        self.backend == StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_database_url() {
        let (host, port, database) = parse_database_url("postgresql://user:pw@db.internal:6543/catalog?sslmode=require");
        assert_eq!(host, "db.internal");
        assert_eq!(port, "6543");
        assert_eq!(database, "catalog");
    }

    #[test]
    fn test_parse_database_url_defaults() {
        let (host, port, database) = parse_database_url("postgresql://user@localhost/");
        assert_eq!(host, "localhost");
        assert_eq!(port, "5432");
        assert_eq!(database, "eeindex");
    }

    #[tokio::test]
    async fn test_memory_storage_starts_empty() {
        let storage = Storage::new(StorageBackend::Memory).await.unwrap();
        assert!(storage.is_ephemeral());
        assert!(storage.index.list_products().await.unwrap().is_empty());
    }
}
