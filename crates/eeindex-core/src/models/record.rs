use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::geometry::{CornerExtents, Footprint, GridSpec};
use super::product::Resolution;
use super::spatial::BoundingBox;

/// Deterministic record identifier.
///
/// A UUID v5 in the URL namespace over the asset id, item id, acquisition
/// time (microsecond precision), and footprint bounds rounded to six
/// decimals. The same raw document always maps to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn derive(
        asset_id: &str,
        item_id: &str,
        acquired_at: DateTime<Utc>,
        bounds: &BoundingBox,
    ) -> Self {
        let key = format!(
            "{}/{}|{}|{:.6},{:.6},{:.6},{:.6}",
            asset_id,
            item_id,
            acquired_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            bounds.min_lon,
            bounds.min_lat,
            bounds.max_lon,
            bounds.max_lat,
        );
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where one measurement of a record can be read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementLocation {
    pub path: String,
    pub band: String,
    pub layer: u32,
}

/// Normalized unit written to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDatasetRecord {
    pub id: RecordId,
    pub product: String,
    pub asset_id: String,
    pub item_id: String,
    pub uri: String,
    pub acquired_at: DateTime<Utc>,
    pub footprint: Footprint,
    pub bounds: BoundingBox,
    pub extent: CornerExtents,
    pub crs: String,
    pub resolution: Resolution,
    pub measurements: BTreeMap<String, MeasurementLocation>,
    pub grids: Vec<GridSpec>,
    pub platform: Option<String>,
    pub instrument: Option<String>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}
