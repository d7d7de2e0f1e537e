//! STAC API adapter (`/collections/{id}` and `/search`)

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat};
use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    CatalogProvider, RawMetadataDocument, StacCollection, StacItem, StacLink, TimeWindow,
};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::http::{HttpSettings, JsonTransport};
use crate::ports::{CatalogClient, CatalogFilters, CatalogPage};

pub struct StacClient {
    base_url: String,
    transport: JsonTransport,
}

/// `/search` response (an ItemCollection)
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    features: Vec<StacItem>,
    #[serde(default)]
    links: Vec<StacLink>,
}

impl StacClient {
    pub fn new(base_url: impl Into<String>, settings: HttpSettings) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| IndexerError::config("catalog_url", format!("'{}': {}", base_url, e)))?;

        Ok(Self {
            base_url,
            transport: JsonTransport::new(settings)?,
        })
    }

    /// First-page search URL; later pages follow the `next` link verbatim
    pub fn search_url(&self, collection: &str, filters: &CatalogFilters) -> Result<Url> {
        let mut url = self.parse(&format!("{}/search", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("collections", collection)
                .append_pair("datetime", &datetime_interval(&filters.window))
                .append_pair("limit", &filters.page_size.to_string());

            if !filters.spatial.is_whole_world() {
                let bbox = filters
                    .spatial
                    .bounds
                    .to_bbox_array()
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                query.append_pair("bbox", &bbox);
            }
        }
        Ok(url)
    }

    fn parse(&self, raw: &str) -> Result<Url> {
        Url::parse(raw).map_err(|e| IndexerError::config("catalog_url", format!("'{}': {}", raw, e)))
    }
}

/// STAC `datetime` intervals are closed, so the end sent is one millisecond
/// before the window's exclusive end
fn datetime_interval(window: &TimeWindow) -> String {
    let last = (window.end() - Duration::milliseconds(1)).max(window.start());
    format!(
        "{}/{}",
        window.start().to_rfc3339_opts(SecondsFormat::Millis, true),
        last.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// `href` of the `next` link; POST pagination cannot be followed with a URL token
fn next_link(links: &[StacLink]) -> Result<Option<String>> {
    let Some(next) = links.iter().find(|link| link.rel == "next") else {
        return Ok(None);
    };

    match next.method.as_deref() {
        None | Some("GET") => Ok(Some(next.href.clone())),
        Some(method) => Err(IndexerError::CatalogResponseInvalid {
            reason: format!("next link uses unsupported method {}", method),
        }),
    }
}

#[async_trait]
impl CatalogClient for StacClient {
    fn provider(&self) -> CatalogProvider {
        CatalogProvider::Stac
    }

    #[instrument(skip(self))]
    async fn fetch_one(&self, asset_id: &str) -> Result<RawMetadataDocument> {
        let url = self.parse(&format!("{}/collections/{}", self.base_url, asset_id))?;
        let collection: StacCollection = self.transport.get_json(url).await?;
        Ok(RawMetadataDocument::StacCollection(collection))
    }

    #[instrument(skip(self, filters), fields(window = %filters.window))]
    async fn fetch_page(
        &self,
        asset_id: &str,
        filters: &CatalogFilters,
        page_token: Option<&str>,
    ) -> Result<CatalogPage> {
        let url = match page_token {
            Some(token) => Url::parse(token).map_err(|e| IndexerError::CatalogResponseInvalid {
                reason: format!("next link '{}' is not a URL: {}", token, e),
            })?,
            None => self.search_url(asset_id, filters)?,
        };

        let response: SearchResponse = self.transport.get_json(url).await?;
        let next_page_token = next_link(&response.links)?;

        debug!(
            items = response.features.len(),
            has_next = next_page_token.is_some(),
            "Received STAC search page"
        );

        Ok(CatalogPage {
            documents: response
                .features
                .into_iter()
                .map(RawMetadataDocument::StacItem)
                .collect(),
            next_page_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use eeindex_core::models::{BoundingBox, SpatialFilter, TimeWindow};

    #[test]
    fn test_search_url() {
        let client = StacClient::new("https://stac.example.com/v1/", HttpSettings::default()).unwrap();
        let filters = CatalogFilters {
            window: TimeWindow::new(
                Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
            )
            .unwrap(),
            spatial: SpatialFilter::from_bounds(
                BoundingBox::from_pairs((-8.5, -6.0), (106.0, 108.5)).unwrap(),
            ),
            page_size: 50,
        };

        let url = client.search_url("sentinel-2-l2a", &filters).unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/v1/search");
        assert_eq!(query["collections"], "sentinel-2-l2a");
        assert_eq!(query["datetime"], "2021-01-01T00:00:00.000Z/2021-12-31T23:59:59.999Z");
        assert_eq!(query["limit"], "50");
        assert_eq!(query["bbox"], "106,-8.5,108.5,-6");
    }

    #[test]
    fn test_datetime_interval_excludes_window_end() {
        let year = TimeWindow::parse("2020").unwrap();
        assert_eq!(
            datetime_interval(&year),
            "2020-01-01T00:00:00.000Z/2020-12-31T23:59:59.999Z"
        );

        let at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let empty = TimeWindow::new(at, at).unwrap();
        assert_eq!(
            datetime_interval(&empty),
            "2020-01-01T00:00:00.000Z/2020-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn test_next_link() {
        let get = StacLink {
            rel: "next".to_string(),
            href: "https://stac.example.com/v1/search?token=abc".to_string(),
            media_type: None,
            method: None,
        };
        assert_eq!(next_link(&[get.clone()]).unwrap().as_deref(), Some(get.href.as_str()));
        assert_eq!(next_link(&[]).unwrap(), None);

        let post = StacLink {
            method: Some("POST".to_string()),
            ..get
        };
        assert!(next_link(&[post]).is_err());
    }
}
