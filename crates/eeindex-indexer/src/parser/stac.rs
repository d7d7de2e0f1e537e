use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    parse_timestamp, CanonicalDatasetRecord, CornerExtents, GridSpec, MeasurementLocation,
    ProductSchema, RecordId, StacAsset, StacItem,
};
use serde_json::Value;
use std::collections::BTreeMap;

use super::decode_geometry;

/// Assets holding raster data rather than thumbnails or metadata sidecars
pub fn is_data_asset(asset: &StacAsset) -> bool {
    if !asset.roles.is_empty() {
        return asset.roles.iter().any(|role| role == "data");
    }
    asset
        .media_type
        .as_deref()
        .is_some_and(|media| media.starts_with("image/tiff"))
}

/// First entry of the raster extension's `raster:bands`
pub fn asset_raster_band(asset: &StacAsset) -> Option<&serde_json::Map<String, Value>> {
    asset
        .extra
        .get("raster:bands")
        .and_then(Value::as_array)
        .and_then(|bands| bands.first())
        .and_then(Value::as_object)
}

pub fn asset_epsg(asset: &StacAsset) -> Option<u64> {
    asset.extra.get("proj:epsg").and_then(Value::as_u64)
}

fn asset_grid(asset: &StacAsset, crs: Option<String>) -> Option<GridSpec> {
    let shape = asset.extra.get("proj:shape")?.as_array()?;
    let transform = asset.extra.get("proj:transform")?.as_array()?;
    if shape.len() != 2 || transform.len() < 6 {
        return None;
    }

    let mut affine = [0.0; 6];
    for (slot, value) in affine.iter_mut().zip(transform) {
        *slot = value.as_f64()?;
    }
    Some(GridSpec {
        shape: [shape[0].as_u64()?, shape[1].as_u64()?],
        transform: affine,
        crs,
    })
}

/// Build the canonical record for one STAC item
pub fn parse_item(item: &StacItem, schema: &ProductSchema) -> Result<CanonicalDatasetRecord> {
    let acquired_at = ["datetime", "start_datetime"]
        .iter()
        .find_map(|key| item.properties.get(*key).and_then(Value::as_str).and_then(parse_timestamp))
        .ok_or_else(|| IndexerError::incomplete(&item.id, "datetime"))?;

    let (footprint, bounds) = decode_geometry(&item.id, item.geometry.as_ref())?;

    let item_epsg = item.properties.get("proj:epsg").and_then(Value::as_u64);

    let mut measurements = BTreeMap::new();
    let mut grids: Vec<GridSpec> = Vec::new();
    for measurement in &schema.measurements {
        let asset = item
            .assets
            .get(&measurement.band)
            .ok_or_else(|| IndexerError::incomplete(&item.id, format!("asset {}", measurement.band)))?;
        measurements.insert(
            measurement.name.clone(),
            MeasurementLocation {
                path: measurement.render_path(&item.id, Some(&asset.href)),
                band: measurement.band.clone(),
                layer: 1,
            },
        );

        let crs = asset_epsg(asset).or(item_epsg).map(|code| format!("EPSG:{}", code));
        if let Some(grid) = asset_grid(asset, crs) {
            if !grids.contains(&grid) {
                grids.push(grid);
            }
        }
    }

    let uri = match item.link("self") {
        Some(link) => link.href.clone(),
        None => format!(
            "stac:{}/{}",
            item.collection.as_deref().unwrap_or(&schema.source_asset),
            item.id
        ),
    };

    Ok(CanonicalDatasetRecord {
        id: RecordId::derive(&schema.source_asset, &item.id, acquired_at, &bounds),
        product: schema.name.clone(),
        asset_id: schema.source_asset.clone(),
        item_id: item.id.clone(),
        uri,
        acquired_at,
        footprint,
        extent: CornerExtents::from(&bounds),
        bounds,
        crs: item_epsg
            .map(|code| format!("EPSG:{}", code))
            .unwrap_or_else(|| schema.output_crs.clone()),
        resolution: schema.resolution,
        measurements,
        grids,
        platform: item
            .properties
            .get("platform")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| schema.metadata.platform.clone()),
        instrument: schema.metadata.instrument.clone(),
        properties: item.properties.clone(),
    })
}
