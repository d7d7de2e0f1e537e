use async_trait::async_trait;
use eeindex_core::error::Result;
use eeindex_core::models::{CatalogProvider, RawMetadataDocument, SpatialFilter, TimeWindow};

/// Filters for one catalog listing request
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFilters {
    pub window: TimeWindow,
    pub spatial: SpatialFilter,
    pub page_size: u32,
}

/// One page of a listing plus the token for the next page
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub documents: Vec<RawMetadataDocument>,
    pub next_page_token: Option<String>,
}

/// Port for a remote imagery catalog
#[async_trait]
pub trait CatalogClient: Send + Sync {
    fn provider(&self) -> CatalogProvider;

    /// Fetch the metadata of a single asset (usually the collection itself)
    async fn fetch_one(&self, asset_id: &str) -> Result<RawMetadataDocument>;

    /// Fetch one page of the asset's items matching `filters`.
    ///
    /// Callers repeat with the returned token until it is `None`.
    async fn fetch_page(
        &self,
        asset_id: &str,
        filters: &CatalogFilters,
        page_token: Option<&str>,
    ) -> Result<CatalogPage>;
}
