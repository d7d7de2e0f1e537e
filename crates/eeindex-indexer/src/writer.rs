use eeindex_core::error::Result;
use eeindex_core::models::{CanonicalDatasetRecord, ProductSchema, UpsertOutcome, WriteMode};
use eeindex_store::DatasetIndex;
use std::sync::Arc;
use tracing::debug;

/// Writes parsed records to the dataset index keyed by their record id
#[derive(Clone)]
pub struct IndexWriter {
    index: Arc<dyn DatasetIndex>,
}

impl IndexWriter {
    pub fn new(index: Arc<dyn DatasetIndex>) -> Self {
        Self { index }
    }

    /// Upsert a batch. Newly written is `inserted + updated`.
    pub async fn upsert(
        &self,
        records: &[CanonicalDatasetRecord],
        mode: WriteMode,
    ) -> Result<UpsertOutcome> {
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let outcome = self.index.upsert(records, mode).await?;
        debug!(
            records = records.len(),
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            ?mode,
            "Upserted batch"
        );
        Ok(outcome)
    }

    pub async fn register_product(&self, schema: &ProductSchema) -> Result<()> {
        self.index.add_product(schema).await
    }

    pub async fn count_for_product(&self, product: &str) -> Result<u64> {
        self.index.count_for_product(product).await
    }
}
