//! Earth Engine REST adapter (`projects.assets.get` and `projects.assets.listImages`)

use async_trait::async_trait;
use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::window::fmt_instant;
use eeindex_core::models::{CatalogProvider, EeAsset, RawMetadataDocument};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::http::{HttpSettings, JsonTransport};
use crate::ports::{CatalogClient, CatalogFilters, CatalogPage};

pub struct EarthEngineClient {
    /// Base URL for the REST API (e.g. "https://earthengine.googleapis.com/v1alpha")
    base_url: String,

    /// Cloud project that owns the assets
    project: String,

    /// Sent as the `key` query parameter when set
    api_key: Option<String>,

    transport: JsonTransport,
}

/// Response body of `listImages`; Earth Engine sends `{}` for an empty listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListImagesResponse {
    #[serde(default)]
    images: Vec<EeAsset>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl EarthEngineClient {
    pub fn new(
        base_url: impl Into<String>,
        project: impl Into<String>,
        settings: HttpSettings,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| IndexerError::config("catalog_url", format!("'{}': {}", base_url, e)))?;

        Ok(Self {
            base_url,
            project: project.into(),
            api_key: None,
            transport: JsonTransport::new(settings)?,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn asset_url(&self, asset_id: &str, method: &str) -> Result<Url> {
        let raw = format!(
            "{}/projects/{}/assets/{}{}",
            self.base_url,
            self.project,
            asset_id.trim_matches('/'),
            method
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| IndexerError::config("asset", format!("'{}' is not addressable: {}", asset_id, e)))?;

        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    /// `listImages` URL for the given filters and page token
    pub fn list_images_url(
        &self,
        asset_id: &str,
        filters: &CatalogFilters,
        page_token: Option<&str>,
    ) -> Result<Url> {
        let mut url = self.asset_url(asset_id, ":listImages")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("startTime", &fmt_instant(filters.window.start()))
                .append_pair("endTime", &fmt_instant(filters.window.end()))
                .append_pair("pageSize", &filters.page_size.to_string());

            if !filters.spatial.is_whole_world() {
                query.append_pair("region", &filters.spatial.to_geojson_polygon().to_string());
            }
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl CatalogClient for EarthEngineClient {
    fn provider(&self) -> CatalogProvider {
        CatalogProvider::EarthEngine
    }

    #[instrument(skip(self))]
    async fn fetch_one(&self, asset_id: &str) -> Result<RawMetadataDocument> {
        let url = self.asset_url(asset_id, "")?;
        let asset: EeAsset = self.transport.get_json(url).await?;
        Ok(RawMetadataDocument::EarthEngine(asset))
    }

    #[instrument(skip(self, filters), fields(window = %filters.window))]
    async fn fetch_page(
        &self,
        asset_id: &str,
        filters: &CatalogFilters,
        page_token: Option<&str>,
    ) -> Result<CatalogPage> {
        let url = self.list_images_url(asset_id, filters, page_token)?;
        let response: ListImagesResponse = self.transport.get_json(url).await?;

        debug!(
            images = response.images.len(),
            has_next = response.next_page_token.is_some(),
            "Received listImages page"
        );

        Ok(CatalogPage {
            documents: response
                .images
                .into_iter()
                .map(RawMetadataDocument::EarthEngine)
                .collect(),
            next_page_token: response.next_page_token.filter(|token| !token.is_empty()),
        })
    }
}
