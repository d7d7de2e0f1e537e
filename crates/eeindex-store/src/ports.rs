use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    AssetReference, CanonicalDatasetRecord, ProductSchema, RecordId, UpsertOutcome, WriteMode,
};
use serde::Serialize;
use std::collections::HashMap;

/// Index contents for one product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub name: String,
    pub source_asset: String,
    pub record_count: u64,
    pub latest_record_time: Option<DateTime<Utc>>,
}

/// Port for the persistent spatial-temporal dataset index
#[async_trait]
pub trait DatasetIndex: Send + Sync {
    /// Product schema registered under `name`
    async fn lookup_product(&self, name: &str) -> Result<Option<ProductSchema>>;

    /// Register a product schema.
    ///
    /// Registering an identical schema again is a no-op; a different schema
    /// under an existing name is rejected.
    async fn add_product(&self, schema: &ProductSchema) -> Result<()>;

    /// All registered products with their record counts
    async fn list_products(&self) -> Result<Vec<ProductSummary>>;

    async fn count_for_product(&self, name: &str) -> Result<u64>;

    /// Acquisition time of the newest record of a product
    async fn latest_record_time(&self, name: &str) -> Result<Option<DateTime<Utc>>>;

    /// Write records keyed by their deterministic id.
    ///
    /// The whole batch is rejected when any record does not match a
    /// registered product schema.
    async fn upsert(
        &self,
        records: &[CanonicalDatasetRecord],
        mode: WriteMode,
    ) -> Result<UpsertOutcome>;

    /// Catalog asset a product was indexed from
    async fn resolve_asset_for_product(&self, name: &str) -> Result<Option<AssetReference>>;

    async fn get_record(&self, id: RecordId) -> Result<Option<CanonicalDatasetRecord>>;
}

/// Check every record against its product schema before anything is written
pub fn check_batch(
    records: &[CanonicalDatasetRecord],
    schemas: &HashMap<String, ProductSchema>,
) -> Result<()> {
    for record in records {
        let schema = schemas.get(&record.product).ok_or_else(|| {
            IndexerError::index_write(format!(
                "record {} references unregistered product '{}'",
                record.id, record.product
            ))
        })?;
        schema.check_record(record)?;
    }
    Ok(())
}
