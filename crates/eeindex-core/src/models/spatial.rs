use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::error::{IndexerError, Result};

/// Latitude/longitude bounding box in degrees (EPSG:4326)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Build from `(min, max)` latitude and longitude pairs.
    ///
    /// Pairs given in descending order are normalized; values outside the
    /// valid degree range are rejected.
    pub fn from_pairs(latitude: (f64, f64), longitude: (f64, f64)) -> Result<Self> {
        let (min_lat, max_lat) = ordered(latitude);
        let (min_lon, max_lon) = ordered(longitude);

        if !(min_lat.is_finite() && max_lat.is_finite() && min_lon.is_finite() && max_lon.is_finite()) {
            return Err(IndexerError::config("bounds", "coordinates must be finite numbers"));
        }
        if min_lat < -90.0 || max_lat > 90.0 {
            return Err(IndexerError::config(
                "latitude",
                format!("({}, {}) is outside [-90, 90]", min_lat, max_lat),
            ));
        }
        if min_lon < -180.0 || max_lon > 180.0 {
            return Err(IndexerError::config(
                "longitude",
                format!("({}, {}) is outside [-180, 180]", min_lon, max_lon),
            ));
        }

        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    pub fn whole_world() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }

    pub fn is_whole_world(&self) -> bool {
        *self == Self::whole_world()
    }

    /// Closed counter-clockwise ring of `[lon, lat]` positions
    pub fn ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.min_lon, self.min_lat],
            [self.max_lon, self.min_lat],
            [self.max_lon, self.max_lat],
            [self.min_lon, self.max_lat],
            [self.min_lon, self.min_lat],
        ]
    }

    /// `[min_lon, min_lat, max_lon, max_lat]`, the GeoJSON/STAC bbox order
    pub fn to_bbox_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }
}

fn ordered((a, b): (f64, f64)) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Spatial constraint for a catalog listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFilter {
    pub bounds: BoundingBox,

    /// Registry name when the bounds came from a named region
    pub region: Option<String>,
}

impl SpatialFilter {
    pub fn whole_world() -> Self {
        Self {
            bounds: BoundingBox::whole_world(),
            region: None,
        }
    }

    pub fn from_bounds(bounds: BoundingBox) -> Self {
        Self {
            bounds,
            region: None,
        }
    }

    pub fn named(region: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            bounds,
            region: Some(region.into()),
        }
    }

    pub fn is_whole_world(&self) -> bool {
        self.bounds.is_whole_world()
    }

    /// GeoJSON polygon covering the bounds
    pub fn to_geojson_polygon(&self) -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [self.bounds.ring()],
        })
    }
}

impl Default for SpatialFilter {
    fn default() -> Self {
        Self::whole_world()
    }
}

impl fmt::Display for SpatialFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(region) = &self.region {
            return write!(f, "region '{}'", region);
        }
        if self.is_whole_world() {
            return write!(f, "whole world");
        }
        let b = &self.bounds;
        write!(
            f,
            "lat [{}, {}] lon [{}, {}]",
            b.min_lat, b.max_lat, b.min_lon, b.max_lon
        )
    }
}
