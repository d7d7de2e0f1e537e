//! Test doubles shared by the pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Datelike;
use eeindex_catalog::{CatalogClient, CatalogFilters, CatalogPage};
use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    parse_timestamp, AssetReference, CanonicalDatasetRecord, CatalogProvider, EeAsset,
    ProductSchema, RawMetadataDocument, RecordId, UpsertOutcome, WriteMode,
};
use eeindex_store::{DatasetIndex, MemoryIndex, ProductSummary};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub const ASSET: &str = "COPERNICUS/S1_GRD";
pub const PRODUCT: &str = "copernicus_s1_grd";

/// An Earth Engine Sentinel-1 image; `None` leaves out the acquisition time
pub fn image(name: &str, start_time: Option<&str>) -> EeAsset {
    let mut value = json!({
        "type": "IMAGE",
        "name": format!("projects/earthengine-public/assets/{}/{}", ASSET, name),
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[106.0, -7.0], [107.0, -7.0], [107.0, -6.0], [106.0, -6.0], [106.0, -7.0]]]
        },
        "bands": [
            { "id": "VV", "dataType": { "precision": "DOUBLE" },
              "grid": { "crsCode": "EPSG:32748", "affineTransform": { "scaleX": 10, "scaleY": -10 },
                        "dimensions": { "width": 100, "height": 100 } } },
            { "id": "VH", "dataType": { "precision": "DOUBLE" },
              "grid": { "crsCode": "EPSG:32748", "affineTransform": { "scaleX": 10, "scaleY": -10 },
                        "dimensions": { "width": 100, "height": 100 } } }
        ]
    });
    if let Some(start) = start_time {
        value["startTime"] = json!(start);
    }
    serde_json::from_value(value).unwrap()
}

/// In-process catalog serving a fixed image list
pub struct FakeCatalog {
    collection: EeAsset,
    images: Vec<EeAsset>,
    page_len: usize,
    failing_years: Vec<i32>,
    closed_windows: bool,
    cancel_after_pages: Option<(usize, CancellationToken)>,
    pub fetch_one_calls: AtomicUsize,
    pub fetch_page_calls: AtomicUsize,
    pub requested_windows: Mutex<Vec<String>>,
}

impl FakeCatalog {
    /// A collection spanning `start` to `end` (inclusive)
    pub fn new(start: &str, end: Option<&str>, images: Vec<EeAsset>) -> Self {
        let mut collection: EeAsset = serde_json::from_value(json!({
            "type": "IMAGE_COLLECTION",
            "name": format!("projects/earthengine-public/assets/{}", ASSET),
            "startTime": start
        }))
        .unwrap();
        collection.end_time = end.map(str::to_string);

        Self {
            collection,
            images,
            page_len: 3,
            failing_years: Vec::new(),
            closed_windows: false,
            cancel_after_pages: None,
            fetch_one_calls: AtomicUsize::new(0),
            fetch_page_calls: AtomicUsize::new(0),
            requested_windows: Mutex::new(Vec::new()),
        }
    }

    /// Listing requests for windows starting in `year` fail after retries
    pub fn failing_year(mut self, year: i32) -> Self {
        self.failing_years.push(year);
        self
    }

    /// Also list images stamped exactly at the window end, as STAC APIs do
    pub fn closed_windows(mut self) -> Self {
        self.closed_windows = true;
        self
    }

    pub fn page_len(mut self, page_len: usize) -> Self {
        self.page_len = page_len;
        self
    }

    /// Cancel `token` once `pages` listing pages have been served
    pub fn cancel_after(mut self, pages: usize, token: CancellationToken) -> Self {
        self.cancel_after_pages = Some((pages, token));
        self
    }

    pub fn calls(&self) -> usize {
        self.fetch_one_calls.load(Ordering::SeqCst) + self.fetch_page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    fn provider(&self) -> CatalogProvider {
        CatalogProvider::EarthEngine
    }

    async fn fetch_one(&self, _asset_id: &str) -> Result<RawMetadataDocument> {
        self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RawMetadataDocument::EarthEngine(self.collection.clone()))
    }

    async fn fetch_page(
        &self,
        _asset_id: &str,
        filters: &CatalogFilters,
        page_token: Option<&str>,
    ) -> Result<CatalogPage> {
        let served = self.fetch_page_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requested_windows
            .lock()
            .unwrap()
            .push(filters.window.to_string());

        if self.failing_years.contains(&filters.window.start().year()) {
            return Err(IndexerError::CatalogUnavailable {
                attempts: 6,
                reason: "HTTP 503 Service Unavailable".to_string(),
            });
        }

        // Images without a timestamp are listed in every window.
        let matching: Vec<&EeAsset> = self
            .images
            .iter()
            .filter(|image| {
                match image.start_time.as_deref().and_then(parse_timestamp) {
                    Some(at) if self.closed_windows => {
                        filters.window.start() <= at && at <= filters.window.end()
                    }
                    Some(at) => filters.window.contains(at),
                    None => true,
                }
            })
            .collect();

        let offset: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = (offset + self.page_len).min(matching.len());
        let documents = matching[offset..end]
            .iter()
            .map(|image| RawMetadataDocument::EarthEngine((*image).clone()))
            .collect();

        if let Some((pages, token)) = &self.cancel_after_pages {
            if served >= *pages {
                token.cancel();
            }
        }

        Ok(CatalogPage {
            documents,
            next_page_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}

/// Index whose writes are always rejected
#[derive(Default)]
pub struct RejectingIndex {
    inner: MemoryIndex,
}

#[async_trait]
impl DatasetIndex for RejectingIndex {
    async fn lookup_product(&self, name: &str) -> Result<Option<ProductSchema>> {
        self.inner.lookup_product(name).await
    }

    async fn add_product(&self, schema: &ProductSchema) -> Result<()> {
        self.inner.add_product(schema).await
    }

    async fn list_products(&self) -> Result<Vec<ProductSummary>> {
        self.inner.list_products().await
    }

    async fn count_for_product(&self, name: &str) -> Result<u64> {
        self.inner.count_for_product(name).await
    }

    async fn latest_record_time(&self, name: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        self.inner.latest_record_time(name).await
    }

    async fn upsert(
        &self,
        _records: &[CanonicalDatasetRecord],
        _mode: WriteMode,
    ) -> Result<UpsertOutcome> {
        Err(IndexerError::index_write("disk full"))
    }

    async fn resolve_asset_for_product(&self, name: &str) -> Result<Option<AssetReference>> {
        self.inner.resolve_asset_for_product(name).await
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<CanonicalDatasetRecord>> {
        self.inner.get_record(id).await
    }
}
