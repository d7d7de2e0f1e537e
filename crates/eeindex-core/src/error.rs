//! Error types for the indexing pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    // Configuration errors
    #[error("Invalid configuration for {key}: {reason}")]
    Configuration { key: String, reason: String },

    #[error("Product not found in index: {name}")]
    ProductNotFound { name: String },

    // Catalog errors
    #[error("Catalog unavailable after {attempts} attempt(s): {reason}")]
    CatalogUnavailable { attempts: u32, reason: String },

    #[error("Catalog returned an invalid response: {reason}")]
    CatalogResponseInvalid { reason: String },

    #[error("Catalog rejected the request (HTTP {status}): {reason}")]
    CatalogRejected { status: u16, reason: String },

    // Record errors
    #[error("Metadata for {item} is incomplete: missing {missing}")]
    MetadataIncomplete { item: String, missing: String },

    // Index errors
    #[error("Index rejected write: {reason}")]
    IndexWrite { reason: String },

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    /// Shorthand for a configuration error
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an index write error
    pub fn index_write(reason: impl Into<String>) -> Self {
        Self::IndexWrite {
            reason: reason.into(),
        }
    }

    /// Shorthand for a record missing a required field
    pub fn incomplete(item: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::MetadataIncomplete {
            item: item.into(),
            missing: missing.into(),
        }
    }

    /// Errors that only fail the bucket they occurred in when a run is
    /// partitioned; a single-bucket run still fails on them
    pub fn is_bucket_scoped(&self) -> bool {
        matches!(
            self,
            Self::CatalogUnavailable { .. }
                | Self::CatalogResponseInvalid { .. }
                | Self::CatalogRejected { .. }
                | Self::MetadataIncomplete { .. }
                | Self::Io(_)
        )
    }

    /// Errors that abort the whole run regardless of partitioning
    pub fn is_fatal_for_run(&self) -> bool {
        !self.is_bucket_scoped()
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(IndexerError::config("resolution", "missing output_crs").is_fatal_for_run());
        assert!(IndexerError::index_write("unknown product").is_fatal_for_run());

        let unavailable = IndexerError::CatalogUnavailable {
            attempts: 5,
            reason: "timeout".to_string(),
        };
        assert!(!unavailable.is_fatal_for_run());
        assert!(unavailable.is_bucket_scoped());

        let rejected = IndexerError::CatalogRejected {
            status: 403,
            reason: "forbidden".to_string(),
        };
        assert!(rejected.is_bucket_scoped());

        assert!(!IndexerError::IndexUnavailable("pool closed".to_string()).is_bucket_scoped());
        assert!(!IndexerError::ProductNotFound {
            name: "landsat_8".to_string()
        }
        .is_bucket_scoped());
    }

    #[test]
    fn test_messages_name_the_cause() {
        let err = IndexerError::incomplete("LC08_044034_20200101", "acquisition time");
        assert_eq!(
            err.to_string(),
            "Metadata for LC08_044034_20200101 is incomplete: missing acquisition time"
        );
    }
}
