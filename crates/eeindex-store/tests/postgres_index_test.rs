//! PostgreSQL index integration tests
//!
//! These tests need a running PostgreSQL server and are skipped unless
//! `DATABASE_URL` is set.

use chrono::{TimeZone, Utc};
use eeindex_core::models::{
    BoundingBox, CanonicalDatasetRecord, CornerExtents, Footprint, MeasurementDefinition,
    MeasurementLocation, ProductMetadata, ProductSchema, RecordId, Resolution, WriteMode,
};
use eeindex_core::IndexerError;
use eeindex_store::postgres::{PostgresConfig, PostgresIndex};
use eeindex_store::DatasetIndex;
use std::collections::BTreeMap;

async fn connect() -> Option<PostgresIndex> {
    let config = PostgresConfig::from_env().ok()?;
    Some(
        PostgresIndex::with_migrations(config)
            .await
            .expect("DATABASE_URL is set but the index is unreachable"),
    )
}

fn schema(name: &str) -> ProductSchema {
    ProductSchema {
        name: name.to_string(),
        source_asset: "LANDSAT/LC08/C01/T1_SR".to_string(),
        description: Some("Landsat 8 surface reflectance".to_string()),
        metadata: ProductMetadata {
            platform: Some("LANDSAT_8".to_string()),
            instrument: Some("OLI_TIRS".to_string()),
            product_type: None,
        },
        measurements: vec![MeasurementDefinition {
            name: "red".to_string(),
            band: "B4".to_string(),
            dtype: "int16".to_string(),
            nodata: Some(-9999.0),
            units: "1".to_string(),
            path_template: "EEDAI:{item}:B4".to_string(),
        }],
        resolution: Resolution::square(0.00027),
        output_crs: "EPSG:4326".to_string(),
    }
}

fn record(product: &str, day: u32) -> CanonicalDatasetRecord {
    let acquired_at = Utc.with_ymd_and_hms(2019, 3, day, 10, 0, 0).unwrap();
    let bounds = BoundingBox::from_pairs((-7.0, -6.0), (106.0, 107.0)).unwrap();
    let item = format!("LC08_122064_201903{:02}", day);
    let mut measurements = BTreeMap::new();
    measurements.insert(
        "red".to_string(),
        MeasurementLocation {
            path: format!("EEDAI:{}:B4", item),
            band: "B4".to_string(),
            layer: 1,
        },
    );

    CanonicalDatasetRecord {
        id: RecordId::derive(product, &item, acquired_at, &bounds),
        product: product.to_string(),
        asset_id: "LANDSAT/LC08/C01/T1_SR".to_string(),
        item_id: item.clone(),
        uri: format!("EEDAI:{}", item),
        acquired_at,
        footprint: Footprint::from_polygon(vec![bounds.ring()]),
        bounds,
        extent: CornerExtents::from(&bounds),
        crs: "EPSG:32648".to_string(),
        resolution: Resolution::square(30.0),
        measurements,
        grids: Vec::new(),
        platform: Some("LANDSAT_8".to_string()),
        instrument: Some("OLI_TIRS".to_string()),
        properties: Default::default(),
    }
}

fn unique_product() -> String {
    format!("test_{}", uuid::Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let Some(index) = connect().await else { return };
    let product = unique_product();
    index.add_product(&schema(&product)).await.unwrap();

    let batch: Vec<_> = (1..=4).map(|d| record(&product, d)).collect();
    let first = index.upsert(&batch, WriteMode::InsertOnly).await.unwrap();
    assert_eq!(first.inserted, 4);

    let second = index.upsert(&batch, WriteMode::InsertOnly).await.unwrap();
    assert_eq!(second.written(), 0);
    assert_eq!(second.skipped, 4);
    assert_eq!(index.count_for_product(&product).await.unwrap(), 4);

    let stored = index.get_record(batch[0].id).await.unwrap().unwrap();
    assert_eq!(stored, batch[0]);
}

#[tokio::test]
async fn test_overwrite_updates_rows() {
    let Some(index) = connect().await else { return };
    let product = unique_product();
    index.add_product(&schema(&product)).await.unwrap();
    index.upsert(&[record(&product, 1)], WriteMode::InsertOnly).await.unwrap();

    let mut changed = record(&product, 1);
    changed.uri = "EEDAI:relocated".to_string();
    let outcome = index
        .upsert(&[changed.clone(), record(&product, 2)], WriteMode::Overwrite)
        .await
        .unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.updated, 1);
    let stored = index.get_record(changed.id).await.unwrap().unwrap();
    assert_eq!(stored.uri, "EEDAI:relocated");
}

#[tokio::test]
async fn test_product_registration_and_summary() {
    let Some(index) = connect().await else { return };
    let product = unique_product();
    index.add_product(&schema(&product)).await.unwrap();
    index.add_product(&schema(&product)).await.unwrap();

    let mut conflicting = schema(&product);
    conflicting.output_crs = "EPSG:3857".to_string();
    assert!(matches!(
        index.add_product(&conflicting).await,
        Err(IndexerError::IndexWrite { .. })
    ));

    index
        .upsert(&[record(&product, 3), record(&product, 9)], WriteMode::InsertOnly)
        .await
        .unwrap();

    let summary = index
        .list_products()
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.name == product)
        .unwrap();
    assert_eq!(summary.record_count, 2);
    assert_eq!(
        summary.latest_record_time,
        Some(Utc.with_ymd_and_hms(2019, 3, 9, 10, 0, 0).unwrap())
    );

    let asset = index.resolve_asset_for_product(&product).await.unwrap().unwrap();
    assert_eq!(asset.asset_id, "LANDSAT/LC08/C01/T1_SR");
}

#[tokio::test]
async fn test_mismatched_batch_writes_nothing() {
    let Some(index) = connect().await else { return };
    let product = unique_product();
    index.add_product(&schema(&product)).await.unwrap();

    let mut stray = record(&product, 2);
    stray.measurements.insert(
        "swir".to_string(),
        MeasurementLocation { path: "x".to_string(), band: "B7".to_string(), layer: 1 },
    );

    let result = index
        .upsert(&[record(&product, 1), stray], WriteMode::InsertOnly)
        .await;
    assert!(matches!(result, Err(IndexerError::IndexWrite { .. })));
    assert_eq!(index.count_for_product(&product).await.unwrap(), 0);
}
