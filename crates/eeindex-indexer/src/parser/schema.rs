//! Product schema synthesis from a sample document

use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    EeAsset, EeBand, EeDataType, MeasurementDefinition, ProductMetadata, ProductOverrides,
    ProductSchema, Resolution, StacAsset, StacItem,
};
use serde_json::Value;
use std::collections::HashSet;

use super::collections::{self, KnownCollection};
use super::stac::{asset_epsg, asset_raster_band, is_data_asset};

/// Fallback data type for STAC assets without `raster:bands`
const STAC_DEFAULT_DTYPE: &str = "float32";

/// Naming inputs shared by every synthesized schema
#[derive(Debug, Clone)]
pub struct SchemaTarget<'a> {
    pub product: &'a str,
    pub asset_id: &'a str,
    pub overrides: &'a ProductOverrides,
}

pub fn from_earth_engine(asset: &EeAsset, target: &SchemaTarget<'_>) -> Result<ProductSchema> {
    let item = asset.item_id();
    let known = collections::lookup(target.asset_id);

    let mut bands: Vec<&EeBand> = match known {
        Some(known) => known
            .bands
            .iter()
            .filter_map(|(id, _)| asset.bands.iter().find(|band| band.id == *id))
            .collect(),
        None => Vec::new(),
    };
    if bands.is_empty() {
        bands = asset.bands.iter().collect();
    }
    if bands.is_empty() {
        return Err(IndexerError::incomplete(item, "bands"));
    }

    let mut measurements: Vec<MeasurementDefinition> = bands
        .iter()
        .map(|band| MeasurementDefinition {
            name: measurement_name(known, &band.id),
            band: band.id.clone(),
            dtype: earth_engine_dtype(band.data_type.as_ref()),
            nodata: None,
            units: "1".to_string(),
            path_template: format!("EEDAI:{{item}}:{}", band.id),
        })
        .collect();
    dedupe_names(&mut measurements);

    // The finest band decides the native resolution and CRS.
    let finest = bands
        .iter()
        .filter_map(|band| {
            let grid = band.grid.as_ref()?;
            let spacing = grid.affine_transform?.scale_x.abs();
            (spacing > 0.0).then_some((spacing, grid.crs()))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0));

    let (resolution, output_crs) = resolve_grid(
        item,
        target.overrides,
        finest.map(|(spacing, _)| spacing),
        finest.and_then(|(_, crs)| crs).map(str::to_string),
    )?;

    Ok(ProductSchema {
        name: target.product.to_string(),
        source_asset: target.asset_id.to_string(),
        description: None,
        metadata: known
            .map(|known| ProductMetadata {
                platform: Some(known.platform.to_string()),
                instrument: Some(known.instrument.to_string()),
                product_type: Some(known.product_type.to_string()),
            })
            .unwrap_or_default(),
        measurements,
        resolution,
        output_crs,
    })
}

pub fn from_stac_item(item: &StacItem, target: &SchemaTarget<'_>) -> Result<ProductSchema> {
    let data_assets: Vec<(&String, &StacAsset)> =
        item.assets.iter().filter(|(_, asset)| is_data_asset(asset)).collect();
    if data_assets.is_empty() {
        return Err(IndexerError::incomplete(&item.id, "data assets"));
    }

    let mut measurements: Vec<MeasurementDefinition> = data_assets
        .iter()
        .map(|(key, asset)| {
            let raster = asset_raster_band(asset);
            MeasurementDefinition {
                name: normalize_name(key),
                band: (*key).clone(),
                dtype: raster
                    .and_then(|band| band.get("data_type"))
                    .and_then(Value::as_str)
                    .unwrap_or(STAC_DEFAULT_DTYPE)
                    .to_string(),
                nodata: raster.and_then(|band| band.get("nodata")).and_then(Value::as_f64),
                units: raster
                    .and_then(|band| band.get("unit"))
                    .and_then(Value::as_str)
                    .unwrap_or("1")
                    .to_string(),
                path_template: "{href}".to_string(),
            }
        })
        .collect();
    dedupe_names(&mut measurements);

    let item_gsd = item.properties.get("gsd").and_then(Value::as_f64);
    let spacing = data_assets
        .iter()
        .filter_map(|(_, asset)| asset.extra.get("gsd").and_then(Value::as_f64).or(item_gsd))
        .filter(|gsd| *gsd > 0.0)
        .min_by(f64::total_cmp)
        .or(item_gsd);

    let native_crs = item
        .properties
        .get("proj:epsg")
        .and_then(Value::as_u64)
        .or_else(|| data_assets.iter().find_map(|(_, asset)| asset_epsg(asset)))
        .map(|code| format!("EPSG:{}", code));

    let (resolution, output_crs) = resolve_grid(&item.id, target.overrides, spacing, native_crs)?;

    Ok(ProductSchema {
        name: target.product.to_string(),
        source_asset: target.asset_id.to_string(),
        description: None,
        metadata: ProductMetadata {
            platform: item.properties.get("platform").and_then(Value::as_str).map(str::to_string),
            instrument: item
                .properties
                .get("instruments")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .filter(|joined| !joined.is_empty()),
            product_type: None,
        },
        measurements,
        resolution,
        output_crs,
    })
}

fn resolve_grid(
    item: &str,
    overrides: &ProductOverrides,
    spacing: Option<f64>,
    native_crs: Option<String>,
) -> Result<(Resolution, String)> {
    let resolution = match overrides.resolution {
        Some(resolution) => resolution,
        None => Resolution::square(spacing.ok_or_else(|| IndexerError::incomplete(item, "pixel spacing"))?),
    };
    let crs = match &overrides.output_crs {
        Some(crs) => crs.clone(),
        None => native_crs.ok_or_else(|| IndexerError::incomplete(item, "crs"))?,
    };
    Ok((resolution, crs))
}

fn measurement_name(known: Option<&KnownCollection>, band: &str) -> String {
    known
        .and_then(|known| known.alias(band))
        .map(str::to_string)
        .unwrap_or_else(|| normalize_name(band))
}

/// Suffix `_2`, `_3`, ... onto names already taken, in band order
fn dedupe_names(measurements: &mut [MeasurementDefinition]) {
    let mut taken = HashSet::new();
    for measurement in measurements.iter_mut() {
        if taken.insert(measurement.name.clone()) {
            continue;
        }
        let base = measurement.name.clone();
        let mut suffix = 2;
        while !taken.insert(format!("{}_{}", base, suffix)) {
            suffix += 1;
        }
        measurement.name = format!("{}_{}", base, suffix);
    }
}

fn normalize_name(band: &str) -> String {
    band.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Smallest integer type covering the declared value range
pub fn earth_engine_dtype(data_type: Option<&EeDataType>) -> String {
    let Some(data_type) = data_type else {
        return "float32".to_string();
    };

    let dtype = match data_type.precision.as_deref() {
        Some("INT") => {
            let min = data_type.range.and_then(|r| r.min).unwrap_or(0.0);
            let max = data_type.range.and_then(|r| r.max).unwrap_or(i32::MAX as f64);
            if min >= 0.0 {
                match max {
                    m if m <= u8::MAX as f64 => "uint8",
                    m if m <= u16::MAX as f64 => "uint16",
                    m if m <= u32::MAX as f64 => "uint32",
                    _ => "float64",
                }
            } else if min >= i8::MIN as f64 && max <= i8::MAX as f64 {
                "int8"
            } else if min >= i16::MIN as f64 && max <= i16::MAX as f64 {
                "int16"
            } else if min >= i32::MIN as f64 && max <= i32::MAX as f64 {
                "int32"
            } else {
                "float64"
            }
        }
        Some("DOUBLE") => "float64",
        _ => "float32",
    };
    dtype.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeindex_core::models::EeDataRange;
    use serde_json::json;

    fn data_type(precision: &str, min: Option<f64>, max: Option<f64>) -> EeDataType {
        EeDataType {
            precision: Some(precision.to_string()),
            range: Some(EeDataRange { min, max }),
        }
    }

    #[test]
    fn test_earth_engine_dtype() {
        assert_eq!(earth_engine_dtype(Some(&data_type("INT", None, Some(255.0)))), "uint8");
        assert_eq!(earth_engine_dtype(Some(&data_type("INT", Some(0.0), Some(65535.0)))), "uint16");
        assert_eq!(earth_engine_dtype(Some(&data_type("INT", Some(-32768.0), Some(32767.0)))), "int16");
        assert_eq!(earth_engine_dtype(Some(&data_type("INT", Some(-1.0), Some(100.0)))), "int8");
        assert_eq!(earth_engine_dtype(Some(&data_type("FLOAT", None, None))), "float32");
        assert_eq!(earth_engine_dtype(Some(&data_type("DOUBLE", None, None))), "float64");
        assert_eq!(earth_engine_dtype(None), "float32");
    }

    #[test]
    fn test_known_collection_schema() {
        let asset: EeAsset = serde_json::from_value(json!({
            "name": "projects/earthengine-public/assets/LANDSAT/LC08/C01/T1_SR/LC08_044034_20140318",
            "startTime": "2014-03-18T18:46:32Z",
            "bands": [
                { "id": "B4", "dataType": { "precision": "INT", "range": { "min": -32768, "max": 32767 } },
                  "grid": { "crsCode": "EPSG:32610", "affineTransform": { "scaleX": 30, "scaleY": -30 } } },
                { "id": "B5", "dataType": { "precision": "INT", "range": { "min": -32768, "max": 32767 } },
                  "grid": { "crsCode": "EPSG:32610", "affineTransform": { "scaleX": 30, "scaleY": -30 } } },
                { "id": "QA_EXTRA", "dataType": { "precision": "INT", "range": { "max": 255 } } }
            ]
        }))
        .unwrap();

        let overrides = ProductOverrides::default();
        let target = SchemaTarget {
            product: "ls8_test",
            asset_id: "LANDSAT/LC08/C01/T1_SR",
            overrides: &overrides,
        };
        let schema = from_earth_engine(&asset, &target).unwrap();

        let names: Vec<_> = schema.measurements.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["red", "nir"]);
        assert_eq!(schema.measurements[0].dtype, "int16");
        assert_eq!(schema.resolution, Resolution::square(30.0));
        assert_eq!(schema.output_crs, "EPSG:32610");
        assert_eq!(schema.metadata.platform.as_deref(), Some("LANDSAT_8"));
    }

    #[test]
    fn test_overrides_win() {
        let asset: EeAsset = serde_json::from_value(json!({
            "name": "projects/earthengine-public/assets/SOME/COLLECTION/IMG",
            "bands": [{ "id": "Band-1" }]
        }))
        .unwrap();

        let overrides =
            ProductOverrides::new(Some((-2.69493352e-4, 2.69493352e-4)), Some("EPSG:4326".into()))
                .unwrap();
        let target = SchemaTarget {
            product: "custom",
            asset_id: "SOME/COLLECTION",
            overrides: &overrides,
        };
        let schema = from_earth_engine(&asset, &target).unwrap();

        assert_eq!(schema.measurements[0].name, "band_1");
        assert_eq!(schema.resolution.x, 2.69493352e-4);
        assert_eq!(schema.output_crs, "EPSG:4326");
        assert_eq!(schema.metadata, ProductMetadata::default());
    }

    #[test]
    fn test_colliding_band_names_are_suffixed() {
        let asset: EeAsset = serde_json::from_value(json!({
            "name": "projects/earthengine-public/assets/SOME/COLLECTION/IMG",
            "bands": [{ "id": "B-1" }, { "id": "B_1" }, { "id": "b.1" }, { "id": "B2" }]
        }))
        .unwrap();

        let overrides = ProductOverrides::new(Some((-10.0, 10.0)), Some("EPSG:4326".into())).unwrap();
        let target = SchemaTarget {
            product: "custom",
            asset_id: "SOME/COLLECTION",
            overrides: &overrides,
        };
        let schema = from_earth_engine(&asset, &target).unwrap();

        let names: Vec<_> = schema
            .measurements
            .iter()
            .map(|m| (m.name.as_str(), m.band.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![("b_1", "B-1"), ("b_1_2", "B_1"), ("b_1_3", "b.1"), ("b2", "B2")]
        );
    }

    #[test]
    fn test_missing_grid_without_overrides() {
        let asset: EeAsset = serde_json::from_value(json!({
            "name": "projects/earthengine-public/assets/SOME/COLLECTION/IMG",
            "bands": [{ "id": "b1" }]
        }))
        .unwrap();

        let overrides = ProductOverrides::default();
        let target = SchemaTarget {
            product: "custom",
            asset_id: "SOME/COLLECTION",
            overrides: &overrides,
        };
        assert!(matches!(
            from_earth_engine(&asset, &target),
            Err(IndexerError::MetadataIncomplete { .. })
        ));
    }
}
