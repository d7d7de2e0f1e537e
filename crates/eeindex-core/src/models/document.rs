//! Raw catalog payloads, one variant per catalog provider.
//!
//! Field values that the parser must validate (timestamps, geometry) are kept
//! as received so that one malformed item fails on its own instead of failing
//! the page it arrived in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Catalog flavour a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogProvider {
    EarthEngine,
    Stac,
}

impl fmt::Display for CatalogProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogProvider::EarthEngine => write!(f, "earthengine"),
            CatalogProvider::Stac => write!(f, "stac"),
        }
    }
}

/// One per-asset metadata document as returned by a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "document", rename_all = "snake_case")]
pub enum RawMetadataDocument {
    EarthEngine(EeAsset),
    StacItem(StacItem),
    StacCollection(StacCollection),
}

impl RawMetadataDocument {
    pub fn provider(&self) -> CatalogProvider {
        match self {
            Self::EarthEngine(_) => CatalogProvider::EarthEngine,
            Self::StacItem(_) | Self::StacCollection(_) => CatalogProvider::Stac,
        }
    }

    /// Identifier of the item within its catalog
    pub fn item_id(&self) -> &str {
        match self {
            Self::EarthEngine(asset) => asset.item_id(),
            Self::StacItem(item) => &item.id,
            Self::StacCollection(collection) => &collection.id,
        }
    }

    /// Overall date range reported for a collection-level document.
    ///
    /// Returns the start and, when the collection is closed, its end.
    pub fn temporal_extent(&self) -> Option<(DateTime<Utc>, Option<DateTime<Utc>>)> {
        match self {
            Self::EarthEngine(asset) => {
                let start = asset.start_time.as_deref().and_then(parse_timestamp)?;
                let end = asset.end_time.as_deref().and_then(parse_timestamp);
                Some((start, end))
            }
            Self::StacCollection(collection) => {
                let interval = collection.extent.temporal.interval.first()?;
                let start = interval.first()?.as_deref().and_then(parse_timestamp)?;
                let end = interval.get(1).and_then(|end| end.as_deref()).and_then(parse_timestamp);
                Some((start, end))
            }
            Self::StacItem(_) => None,
        }
    }
}

/// Parse an RFC 3339 timestamp as sent by either catalog
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}

/// Earth Engine asset (`projects.assets.get` / `listImages` entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EeAsset {
    /// Full resource name, `projects/{project}/assets/{id}`
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "type", default)]
    pub asset_type: Option<String>,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default)]
    pub end_time: Option<String>,

    #[serde(default)]
    pub geometry: Option<serde_json::Value>,

    #[serde(default)]
    pub bands: Vec<EeBand>,

    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub update_time: Option<String>,
}

impl EeAsset {
    /// `id`, or the resource name without its `projects/*/assets/` prefix
    pub fn item_id(&self) -> &str {
        if let Some(id) = self.id.as_deref() {
            return id;
        }
        match self.name.split_once("/assets/") {
            Some((_, id)) => id,
            None => &self.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EeBand {
    pub id: String,

    #[serde(default)]
    pub data_type: Option<EeDataType>,

    #[serde(default)]
    pub grid: Option<EeGrid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EeDataType {
    /// `INT`, `FLOAT`, or `DOUBLE`
    #[serde(default)]
    pub precision: Option<String>,

    #[serde(default)]
    pub range: Option<EeDataRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EeDataRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EeGrid {
    #[serde(default)]
    pub crs_code: Option<String>,

    #[serde(default)]
    pub crs_wkt: Option<String>,

    #[serde(default)]
    pub affine_transform: Option<EeAffineTransform>,

    #[serde(default)]
    pub dimensions: Option<EeDimensions>,
}

impl EeGrid {
    pub fn crs(&self) -> Option<&str> {
        self.crs_code.as_deref().or(self.crs_wkt.as_deref())
    }
}

/// Earth Engine omits zero coefficients, so every field defaults to 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EeAffineTransform {
    pub scale_x: f64,
    pub shear_x: f64,
    pub translate_x: f64,
    pub shear_y: f64,
    pub scale_y: f64,
    pub translate_y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EeDimensions {
    pub width: u64,
    pub height: u64,
}

/// STAC Item (a GeoJSON Feature)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacItem {
    pub id: String,

    #[serde(default)]
    pub collection: Option<String>,

    #[serde(default)]
    pub geometry: Option<serde_json::Value>,

    #[serde(default)]
    pub bbox: Option<Vec<f64>>,

    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub assets: BTreeMap<String, StacAsset>,

    #[serde(default)]
    pub links: Vec<StacLink>,
}

impl StacItem {
    pub fn link(&self, rel: &str) -> Option<&StacLink> {
        self.links.iter().find(|link| link.rel == rel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacAsset {
    pub href: String,

    #[serde(rename = "type", default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,

    /// Extension fields such as `gsd`, `proj:shape`, `proj:transform`
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacLink {
    pub rel: String,
    pub href: String,

    #[serde(rename = "type", default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub method: Option<String>,
}

/// STAC Collection, fetched to learn the overall date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacCollection {
    pub id: String,

    #[serde(default)]
    pub description: Option<String>,

    pub extent: StacExtent,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacExtent {
    pub temporal: StacTemporalExtent,

    #[serde(default)]
    pub spatial: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacTemporalExtent {
    pub interval: Vec<Vec<Option<String>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ee_asset_from_list_images_entry() {
        let asset: EeAsset = serde_json::from_value(json!({
            "type": "IMAGE",
            "name": "projects/earthengine-public/assets/COPERNICUS/S2_SR/20190105T034119_20190105T034117_T47MQV",
            "startTime": "2019-01-05T03:41:19.462Z",
            "bands": [{
                "id": "B4",
                "dataType": { "precision": "INT", "range": { "max": 65535 } },
                "grid": {
                    "crsCode": "EPSG:32747",
                    "affineTransform": { "scaleX": 10, "translateX": 699960, "scaleY": -10, "translateY": 9800020 },
                    "dimensions": { "width": 10980, "height": 10980 }
                }
            }],
            "sizeBytes": "1183938461"
        }))
        .unwrap();

        assert_eq!(asset.item_id(), "COPERNICUS/S2_SR/20190105T034119_20190105T034117_T47MQV");
        assert_eq!(asset.asset_type.as_deref(), Some("IMAGE"));

        let grid = asset.bands[0].grid.as_ref().unwrap();
        assert_eq!(grid.crs(), Some("EPSG:32747"));
        let transform = grid.affine_transform.unwrap();
        assert_eq!(transform.scale_x, 10.0);
        assert_eq!(transform.shear_x, 0.0);
    }

    #[test]
    fn test_collection_temporal_extent() {
        let collection = RawMetadataDocument::EarthEngine(EeAsset {
            name: "projects/earthengine-public/assets/COPERNICUS/S1_GRD".to_string(),
            id: Some("COPERNICUS/S1_GRD".to_string()),
            asset_type: Some("IMAGE_COLLECTION".to_string()),
            start_time: Some("2014-10-03T00:00:00Z".to_string()),
            end_time: None,
            geometry: None,
            bands: Vec::new(),
            properties: Default::default(),
            update_time: None,
        });

        let (start, end) = collection.temporal_extent().unwrap();
        assert_eq!(start.to_rfc3339(), "2014-10-03T00:00:00+00:00");
        assert!(end.is_none());
    }

    #[test]
    fn test_stac_collection_open_interval() {
        let doc: StacCollection = serde_json::from_value(json!({
            "id": "sentinel-2-l2a",
            "extent": {
                "spatial": { "bbox": [[-180, -90, 180, 90]] },
                "temporal": { "interval": [["2015-06-27T10:25:31Z", null]] }
            },
            "license": "proprietary"
        }))
        .unwrap();

        let (_, end) = RawMetadataDocument::StacCollection(doc.clone()).temporal_extent().unwrap();
        assert!(end.is_none());
        assert_eq!(doc.extra["license"], "proprietary");
    }
}
