use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::CanonicalDatasetRecord;
use crate::error::{IndexerError, Result};

/// Pixel size as `(y, x)`; `y` is negative for north-up grids
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub y: f64,
    pub x: f64,
}

impl Resolution {
    pub fn new(y: f64, x: f64) -> Result<Self> {
        if !(y.is_finite() && x.is_finite()) || y == 0.0 || x == 0.0 {
            return Err(IndexerError::config(
                "resolution",
                format!("({}, {}) must be two non-zero finite numbers", y, x),
            ));
        }
        Ok(Self { y, x })
    }

    /// North-up resolution for a square pixel spacing
    pub fn square(spacing: f64) -> Self {
        Self {
            y: -spacing.abs(),
            x: spacing.abs(),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.y, self.x)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub platform: Option<String>,
    pub instrument: Option<String>,
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementDefinition {
    /// Canonical measurement name (e.g. `red`)
    pub name: String,

    /// Source band id or asset key in the catalog (e.g. `B4`)
    pub band: String,

    pub dtype: String,

    #[serde(default)]
    pub nodata: Option<f64>,

    #[serde(default = "default_units")]
    pub units: String,

    /// Storage path with `{item}` and `{href}` placeholders
    pub path_template: String,
}

fn default_units() -> String {
    "1".to_string()
}

impl MeasurementDefinition {
    pub fn render_path(&self, item: &str, href: Option<&str>) -> String {
        self.path_template
            .replace("{item}", item)
            .replace("{href}", href.unwrap_or_default())
    }
}

/// Canonical description of a product, shared by all of its records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSchema {
    pub name: String,
    pub source_asset: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub metadata: ProductMetadata,

    pub measurements: Vec<MeasurementDefinition>,
    pub resolution: Resolution,
    pub output_crs: String,
}

impl ProductSchema {
    pub fn measurement(&self, name: &str) -> Option<&MeasurementDefinition> {
        self.measurements.iter().find(|m| m.name == name)
    }

    /// Reject a record that does not belong to this schema
    pub fn check_record(&self, record: &CanonicalDatasetRecord) -> Result<()> {
        if record.product != self.name {
            return Err(IndexerError::index_write(format!(
                "record {} belongs to product '{}', not '{}'",
                record.id, record.product, self.name
            )));
        }

        if let Some(unknown) = record
            .measurements
            .keys()
            .find(|name| self.measurement(name).is_none())
        {
            return Err(IndexerError::index_write(format!(
                "record {} has measurement '{}' which product '{}' does not declare",
                record.id, unknown, self.name
            )));
        }

        Ok(())
    }
}

/// Caller-supplied resolution and CRS; only valid as a matched pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductOverrides {
    pub resolution: Option<Resolution>,
    pub output_crs: Option<String>,
}

impl ProductOverrides {
    pub fn new(resolution: Option<(f64, f64)>, output_crs: Option<String>) -> Result<Self> {
        match (resolution, output_crs) {
            (Some((y, x)), Some(crs)) => {
                if crs.trim().is_empty() {
                    return Err(IndexerError::config("output_crs", "cannot be empty"));
                }
                Ok(Self {
                    resolution: Some(Resolution::new(y, x)?),
                    output_crs: Some(crs),
                })
            }
            (None, None) => Ok(Self::default()),
            (Some(_), None) => Err(IndexerError::config(
                "output_crs",
                "a resolution was supplied without an output CRS; supply both or neither",
            )),
            (None, Some(_)) => Err(IndexerError::config(
                "resolution",
                "an output CRS was supplied without a resolution; supply both or neither",
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resolution.is_none() && self.output_crs.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_require_matched_pair() {
        assert!(ProductOverrides::new(None, None).unwrap().is_empty());
        assert!(ProductOverrides::new(Some((-0.0002, 0.0002)), Some("EPSG:4326".into())).is_ok());

        match ProductOverrides::new(Some((-0.0002, 0.0002)), None) {
            Err(IndexerError::Configuration { key, .. }) => assert_eq!(key, "output_crs"),
            other => panic!("expected configuration error, got {:?}", other),
        }
        match ProductOverrides::new(None, Some("EPSG:4326".into())) {
            Err(IndexerError::Configuration { key, .. }) => assert_eq!(key, "resolution"),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_rejects_zero() {
        assert!(Resolution::new(0.0, 10.0).is_err());
        assert_eq!(Resolution::square(30.0), Resolution { y: -30.0, x: 30.0 });
    }

    #[test]
    fn test_render_path() {
        let measurement = MeasurementDefinition {
            name: "red".to_string(),
            band: "B4".to_string(),
            dtype: "uint16".to_string(),
            nodata: None,
            units: "1".to_string(),
            path_template: "EEDAI:{item}:B4".to_string(),
        };
        assert_eq!(
            measurement.render_path("projects/earthengine-public/assets/X/1", None),
            "EEDAI:projects/earthengine-public/assets/X/1:B4"
        );
    }
}
