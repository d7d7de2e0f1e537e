//! In-memory dataset index for development and testing.
//!
//! These implementations use `RwLock::unwrap()` intentionally. Lock poisoning
//! only occurs when another thread panicked while holding the lock, which is
//! an unrecoverable state. For persistent indexes, use the PostgreSQL backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    AssetReference, CanonicalDatasetRecord, ProductSchema, RecordId, UpsertOutcome, WriteMode,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::ports::{check_batch, DatasetIndex, ProductSummary};

#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    products: Arc<RwLock<BTreeMap<String, ProductSchema>>>,
    records: Arc<RwLock<HashMap<RecordId, CanonicalDatasetRecord>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all products
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DatasetIndex for MemoryIndex {
    async fn lookup_product(&self, name: &str) -> Result<Option<ProductSchema>> {
        Ok(self.products.read().unwrap().get(name).cloned())
    }

    async fn add_product(&self, schema: &ProductSchema) -> Result<()> {
        let mut products = self.products.write().unwrap();

        match products.get(&schema.name) {
            Some(existing) if existing == schema => Ok(()),
            Some(_) => Err(IndexerError::index_write(format!(
                "product '{}' is already registered with a different definition",
                schema.name
            ))),
            None => {
                products.insert(schema.name.clone(), schema.clone());
                Ok(())
            }
        }
    }

    async fn list_products(&self) -> Result<Vec<ProductSummary>> {
        let products = self.products.read().unwrap();
        let records = self.records.read().unwrap();

        Ok(products
            .values()
            .map(|schema| {
                let mine = records.values().filter(|r| r.product == schema.name);
                let (count, latest) = mine.fold((0u64, None), |(count, latest), record| {
                    (count + 1, latest.max(Some(record.acquired_at)))
                });
                ProductSummary {
                    name: schema.name.clone(),
                    source_asset: schema.source_asset.clone(),
                    record_count: count,
                    latest_record_time: latest,
                }
            })
            .collect())
    }

    async fn count_for_product(&self, name: &str) -> Result<u64> {
        let records = self.records.read().unwrap();
        Ok(records.values().filter(|r| r.product == name).count() as u64)
    }

    async fn latest_record_time(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let records = self.records.read().unwrap();
        Ok(records
            .values()
            .filter(|r| r.product == name)
            .map(|r| r.acquired_at)
            .max())
    }

    async fn upsert(
        &self,
        records: &[CanonicalDatasetRecord],
        mode: WriteMode,
    ) -> Result<UpsertOutcome> {
        {
            let products = self.products.read().unwrap();
            let schemas: HashMap<String, ProductSchema> = records
                .iter()
                .filter_map(|r| products.get(&r.product))
                .map(|schema| (schema.name.clone(), schema.clone()))
                .collect();
            check_batch(records, &schemas)?;
        }

        let mut stored = self.records.write().unwrap();
        let mut outcome = UpsertOutcome::default();

        for record in records {
            match (stored.contains_key(&record.id), mode) {
                (false, _) => {
                    stored.insert(record.id, record.clone());
                    outcome.inserted += 1;
                }
                (true, WriteMode::Overwrite) => {
                    stored.insert(record.id, record.clone());
                    outcome.updated += 1;
                }
                (true, WriteMode::InsertOnly) => outcome.skipped += 1,
            }
        }

        Ok(outcome)
    }

    async fn resolve_asset_for_product(&self, name: &str) -> Result<Option<AssetReference>> {
        let products = self.products.read().unwrap();
        Ok(products
            .get(name)
            .map(|schema| AssetReference::indexed_as(schema.source_asset.clone(), schema.name.clone())))
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<CanonicalDatasetRecord>> {
        Ok(self.records.read().unwrap().get(&id).cloned())
    }
}
