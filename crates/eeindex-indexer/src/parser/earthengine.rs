use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    parse_timestamp, CanonicalDatasetRecord, CornerExtents, EeAsset, EeBand, GridSpec,
    MeasurementLocation, ProductSchema, RecordId,
};
use std::collections::BTreeMap;

use super::decode_geometry;

/// Build the canonical record for one Earth Engine image
pub fn parse_image(asset: &EeAsset, schema: &ProductSchema) -> Result<CanonicalDatasetRecord> {
    let item = asset.item_id();

    let acquired_at = asset
        .start_time
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| asset.end_time.as_deref().and_then(parse_timestamp))
        .ok_or_else(|| IndexerError::incomplete(item, "startTime"))?;

    let (footprint, bounds) = decode_geometry(item, asset.geometry.as_ref())?;

    let mut measurements = BTreeMap::new();
    let mut measured: Vec<&EeBand> = Vec::with_capacity(schema.measurements.len());
    for measurement in &schema.measurements {
        let band = asset
            .bands
            .iter()
            .find(|band| band.id == measurement.band)
            .ok_or_else(|| IndexerError::incomplete(item, format!("band {}", measurement.band)))?;
        measured.push(band);
        measurements.insert(
            measurement.name.clone(),
            MeasurementLocation {
                path: measurement.render_path(&asset.name, None),
                band: band.id.clone(),
                layer: 1,
            },
        );
    }

    let crs = measured
        .iter()
        .find_map(|band| band.grid.as_ref().and_then(|grid| grid.crs()))
        .unwrap_or(schema.output_crs.as_str())
        .to_string();

    let mut grids: Vec<GridSpec> = Vec::new();
    for grid in measured.iter().filter_map(|band| band.grid.as_ref()) {
        let (Some(transform), Some(dimensions)) = (grid.affine_transform, grid.dimensions) else {
            continue;
        };
        let spec = GridSpec {
            shape: [dimensions.height, dimensions.width],
            transform: [
                transform.scale_x,
                transform.shear_x,
                transform.translate_x,
                transform.shear_y,
                transform.scale_y,
                transform.translate_y,
            ],
            crs: grid.crs().map(str::to_string),
        };
        if !grids.contains(&spec) {
            grids.push(spec);
        }
    }

    Ok(CanonicalDatasetRecord {
        id: RecordId::derive(&schema.source_asset, item, acquired_at, &bounds),
        product: schema.name.clone(),
        asset_id: schema.source_asset.clone(),
        item_id: item.to_string(),
        uri: format!("EEDAI:{}", asset.name),
        acquired_at,
        footprint,
        extent: CornerExtents::from(&bounds),
        bounds,
        crs,
        resolution: schema.resolution,
        measurements,
        grids,
        platform: schema.metadata.platform.clone(),
        instrument: schema.metadata.instrument.clone(),
        properties: asset.properties.clone(),
    })
}
