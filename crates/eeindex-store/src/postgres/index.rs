//! DatasetIndex implementation for PostgreSQL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    AssetReference, CanonicalDatasetRecord, ProductSchema, RecordId, UpsertOutcome, WriteMode,
};
use sqlx::types::Json;
use sqlx::Row;
use std::collections::HashMap;
use tracing::debug;

use super::PostgresIndex;
use crate::ports::{check_batch, DatasetIndex, ProductSummary};

fn unavailable(what: &str, e: sqlx::Error) -> IndexerError {
    IndexerError::IndexUnavailable(format!("failed to {}: {}", what, e))
}

fn write_failed(what: &str, e: sqlx::Error) -> IndexerError {
    IndexerError::index_write(format!("failed to {}: {}", what, e))
}

impl PostgresIndex {
    async fn schemas_for(
        &self,
        records: &[CanonicalDatasetRecord],
    ) -> Result<HashMap<String, ProductSchema>> {
        let mut names: Vec<String> = records.iter().map(|r| r.product.clone()).collect();
        names.sort();
        names.dedup();

        let rows: Vec<(Json<ProductSchema>,)> =
            sqlx::query_as("SELECT definition FROM products WHERE name = ANY($1)")
                .bind(&names)
                .fetch_all(self.pool())
                .await
                .map_err(|e| unavailable("load product schemas", e))?;

        Ok(rows
            .into_iter()
            .map(|(Json(schema),)| (schema.name.clone(), schema))
            .collect())
    }
}

#[async_trait]
impl DatasetIndex for PostgresIndex {
    async fn lookup_product(&self, name: &str) -> Result<Option<ProductSchema>> {
        let row: Option<(Json<ProductSchema>,)> =
            sqlx::query_as("SELECT definition FROM products WHERE name = $1")
                .bind(name)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| unavailable("look up product", e))?;

        Ok(row.map(|(Json(schema),)| schema))
    }

    async fn add_product(&self, schema: &ProductSchema) -> Result<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO products (name, source_asset, definition)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(&schema.name)
        .bind(&schema.source_asset)
        .bind(Json(schema))
        .execute(self.pool())
        .await
        .map_err(|e| write_failed("register product", e))?
        .rows_affected();

        if inserted == 1 {
            debug!(product = %schema.name, "Registered product");
            return Ok(());
        }

        match self.lookup_product(&schema.name).await? {
            Some(existing) if existing == *schema => Ok(()),
            _ => Err(IndexerError::index_write(format!(
                "product '{}' is already registered with a different definition",
                schema.name
            ))),
        }
    }

    async fn list_products(&self) -> Result<Vec<ProductSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT p.name, p.source_asset, COUNT(d.id) AS record_count, MAX(d.acquired_at) AS latest
            FROM products p
            LEFT JOIN datasets d ON d.product = p.name
            GROUP BY p.name, p.source_asset
            ORDER BY p.name
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| unavailable("list products", e))?;

        Ok(rows
            .into_iter()
            .map(|row| ProductSummary {
                name: row.get("name"),
                source_asset: row.get("source_asset"),
                record_count: row.get::<i64, _>("record_count") as u64,
                latest_record_time: row.get("latest"),
            })
            .collect())
    }

    async fn count_for_product(&self, name: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM datasets WHERE product = $1")
            .bind(name)
            .fetch_one(self.pool())
            .await
            .map_err(|e| unavailable("count records", e))?;
        Ok(count as u64)
    }

    async fn latest_record_time(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        sqlx::query_scalar("SELECT MAX(acquired_at) FROM datasets WHERE product = $1")
            .bind(name)
            .fetch_one(self.pool())
            .await
            .map_err(|e| unavailable("read latest record time", e))
    }

    async fn upsert(
        &self,
        records: &[CanonicalDatasetRecord],
        mode: WriteMode,
    ) -> Result<UpsertOutcome> {
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let schemas = self.schemas_for(records).await?;
        check_batch(records, &schemas)?;

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| write_failed("begin transaction", e))?;
        let mut outcome = UpsertOutcome::default();

        for record in records {
            let insert = match mode {
                WriteMode::InsertOnly => {
                    r#"
                    INSERT INTO datasets (id, product, item_id, uri, acquired_at,
                                          min_lon, min_lat, max_lon, max_lat, record)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    ON CONFLICT (id) DO NOTHING
                    RETURNING TRUE AS inserted
                    "#
                }
                WriteMode::Overwrite => {
                    r#"
                    INSERT INTO datasets (id, product, item_id, uri, acquired_at,
                                          min_lon, min_lat, max_lon, max_lat, record)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    ON CONFLICT (id) DO UPDATE
                    SET product = EXCLUDED.product,
                        item_id = EXCLUDED.item_id,
                        uri = EXCLUDED.uri,
                        acquired_at = EXCLUDED.acquired_at,
                        min_lon = EXCLUDED.min_lon,
                        min_lat = EXCLUDED.min_lat,
                        max_lon = EXCLUDED.max_lon,
                        max_lat = EXCLUDED.max_lat,
                        record = EXCLUDED.record,
                        updated_at = NOW()
                    RETURNING (xmax = 0) AS inserted
                    "#
                }
            };

            let inserted: Option<bool> = sqlx::query_scalar(insert)
                .bind(record.id.0)
                .bind(&record.product)
                .bind(&record.item_id)
                .bind(&record.uri)
                .bind(record.acquired_at)
                .bind(record.bounds.min_lon)
                .bind(record.bounds.min_lat)
                .bind(record.bounds.max_lon)
                .bind(record.bounds.max_lat)
                .bind(Json(record))
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| write_failed("write dataset record", e))?;

            match inserted {
                Some(true) => outcome.inserted += 1,
                Some(false) => outcome.updated += 1,
                None => outcome.skipped += 1,
            }
        }

        tx.commit()
            .await
            .map_err(|e| write_failed("commit transaction", e))?;

        debug!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "Wrote dataset batch"
        );
        Ok(outcome)
    }

    async fn resolve_asset_for_product(&self, name: &str) -> Result<Option<AssetReference>> {
        let asset: Option<String> =
            sqlx::query_scalar("SELECT source_asset FROM products WHERE name = $1")
                .bind(name)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| unavailable("resolve product asset", e))?;

        Ok(asset.map(|asset| AssetReference::indexed_as(asset, name)))
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<CanonicalDatasetRecord>> {
        let row: Option<(Json<CanonicalDatasetRecord>,)> =
            sqlx::query_as("SELECT record FROM datasets WHERE id = $1")
                .bind(id.0)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| unavailable("get dataset record", e))?;

        Ok(row.map(|(Json(record),)| record))
    }
}
