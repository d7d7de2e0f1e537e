//! Named regions loaded from an operator-supplied TOML file:
//!
//! ```toml
//! [regions.java]
//! latitude = [-8.8, -5.9]
//! longitude = [105.0, 114.6]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{IndexerError, Result};
use crate::models::{BoundingBox, SpatialFilter};

#[derive(Debug, Clone, Default)]
pub struct RegionRegistry {
    regions: BTreeMap<String, BoundingBox>,
}

#[derive(Debug, Deserialize)]
struct RegionsFile {
    #[serde(default)]
    regions: BTreeMap<String, RegionEntry>,
}

#[derive(Debug, Deserialize)]
struct RegionEntry {
    latitude: (f64, f64),
    longitude: (f64, f64),
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry; a missing file yields an empty registry
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Regions file not found, registry is empty");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: RegionsFile = toml::from_str(content)
            .map_err(|e| IndexerError::config("regions_file", format!("Failed to parse TOML: {}", e)))?;

        let mut registry = Self::default();
        for (name, entry) in file.regions {
            let bounds = BoundingBox::from_pairs(entry.latitude, entry.longitude).map_err(|e| {
                IndexerError::config(format!("regions.{}", name), e.to_string())
            })?;
            registry.insert(name, bounds);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, bounds: BoundingBox) {
        self.regions.insert(name.into(), bounds);
    }

    /// Resolve a region name; unknown names are a configuration error
    pub fn resolve(&self, name: &str) -> Result<SpatialFilter> {
        match self.regions.get(name) {
            Some(bounds) => Ok(SpatialFilter::named(name, *bounds)),
            None => {
                let known = if self.regions.is_empty() {
                    "no regions are configured".to_string()
                } else {
                    format!("known regions: {}", self.names().collect::<Vec<_>>().join(", "))
                };
                Err(IndexerError::config(
                    "region",
                    format!("unknown region '{}' ({})", name, known),
                ))
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundingBox)> {
        self.regions.iter().map(|(name, bounds)| (name.as_str(), bounds))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
