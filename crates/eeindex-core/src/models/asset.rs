use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog entry, optionally tied to the product it is indexed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    /// Catalog-specific identifier (e.g. `COPERNICUS/S2_SR`)
    pub asset_id: String,

    /// Product name once the asset has been indexed
    pub product: Option<String>,
}

impl AssetReference {
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            product: None,
        }
    }

    pub fn indexed_as(asset_id: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            product: Some(product.into()),
        }
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.product {
            Some(product) => write!(f, "{} ({})", self.asset_id, product),
            None => write!(f, "{}", self.asset_id),
        }
    }
}

/// Product name used for an asset that has never been indexed.
///
/// Lowercases the id and replaces every run of non-alphanumeric characters
/// with a single underscore: `LANDSAT/LC08/C01/T1_SR` becomes `landsat_lc08_c01_t1_sr`.
pub fn derive_product_name(asset_id: &str) -> String {
    let mut name = String::with_capacity(asset_id.len());
    let mut pending_separator = false;

    for c in asset_id.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !name.is_empty() {
                name.push('_');
            }
            pending_separator = false;
            name.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_product_name() {
        assert_eq!(derive_product_name("LANDSAT/LC08/C01/T1_SR"), "landsat_lc08_c01_t1_sr");
        assert_eq!(derive_product_name("COPERNICUS/S2_SR"), "copernicus_s2_sr");
        assert_eq!(derive_product_name("/NASA_USDA//HSL/SMAP10KM_soil_moisture/"), "nasa_usda_hsl_smap10km_soil_moisture");
        assert_eq!(derive_product_name("sentinel-2-l2a"), "sentinel_2_l2a");
    }

    #[test]
    fn test_display() {
        assert_eq!(AssetReference::new("COPERNICUS/S1_GRD").to_string(), "COPERNICUS/S1_GRD");
        assert_eq!(
            AssetReference::indexed_as("COPERNICUS/S1_GRD", "s1_google").to_string(),
            "COPERNICUS/S1_GRD (s1_google)"
        );
    }
}
