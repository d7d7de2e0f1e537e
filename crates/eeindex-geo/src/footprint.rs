use eeindex_core::models::{BoundingBox, Footprint};
use geo::{Area, BoundingRect, LineString, MultiPolygon, Polygon};
use serde_json::Value;
use thiserror::Error;

use crate::validation::validate_footprint;

#[derive(Debug, Error)]
pub enum FootprintError {
    #[error("unsupported geometry type '{0}'")]
    UnsupportedType(String),

    #[error("malformed coordinates: {0}")]
    Malformed(String),

    #[error("coordinate at {location} is not a number")]
    NotANumber { location: String },

    #[error("invalid footprint: {0}")]
    Invalid(String),

    #[error("footprint has zero area")]
    Degenerate,
}

/// Decode a GeoJSON `Polygon` or `MultiPolygon`.
///
/// Earth Engine encodes unbounded coordinates as the strings `"Infinity"` and
/// `"-Infinity"`; those, and any other out-of-range value, are clamped to the
/// world extent. Numeric strings are accepted. NaN is rejected.
pub fn decode_footprint(geometry: &Value) -> Result<Footprint, FootprintError> {
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| FootprintError::Malformed("missing geometry type".to_string()))?;
    let coordinates = geometry
        .get("coordinates")
        .ok_or_else(|| FootprintError::Malformed("missing coordinates".to_string()))?;

    let polygons = match kind {
        "Polygon" => vec![decode_polygon(coordinates, "0")?],
        "MultiPolygon" => as_array(coordinates, "coordinates")?
            .iter()
            .enumerate()
            .map(|(i, polygon)| decode_polygon(polygon, &i.to_string()))
            .collect::<Result<Vec<_>, _>>()?,
        other => return Err(FootprintError::UnsupportedType(other.to_string())),
    };

    let footprint = Footprint { polygons };

    let validation = validate_footprint(&footprint);
    if !validation.is_valid {
        return Err(FootprintError::Invalid(validation.summary()));
    }
    if to_geo_multipolygon(&footprint).unsigned_area() == 0.0 {
        return Err(FootprintError::Degenerate);
    }

    Ok(footprint)
}

fn decode_polygon(value: &Value, location: &str) -> Result<Vec<Vec<[f64; 2]>>, FootprintError> {
    as_array(value, location)?
        .iter()
        .enumerate()
        .map(|(r, ring)| -> Result<Vec<[f64; 2]>, FootprintError> {
            as_array(ring, location)?
                .iter()
                .enumerate()
                .map(|(p, position)| decode_position(position, &format!("{}/{}/{}", location, r, p)))
                .collect()
        })
        .collect()
}

fn decode_position(value: &Value, location: &str) -> Result<[f64; 2], FootprintError> {
    let parts = as_array(value, location)?;
    if parts.len() < 2 {
        return Err(FootprintError::Malformed(format!(
            "position {} has {} value(s)",
            location,
            parts.len()
        )));
    }

    let lon = decode_ordinate(&parts[0], location)?;
    let lat = decode_ordinate(&parts[1], location)?;
    Ok([lon.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0)])
}

fn decode_ordinate(value: &Value, location: &str) -> Result<f64, FootprintError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if !n.is_nan() => Ok(n),
        _ => Err(FootprintError::NotANumber {
            location: location.to_string(),
        }),
    }
}

fn as_array<'a>(value: &'a Value, location: &str) -> Result<&'a Vec<Value>, FootprintError> {
    value
        .as_array()
        .ok_or_else(|| FootprintError::Malformed(format!("expected an array at {}", location)))
}

/// Convert to a `geo` multipolygon; the first ring of each polygon is the exterior
pub fn to_geo_multipolygon(footprint: &Footprint) -> MultiPolygon<f64> {
    let polygons = footprint
        .polygons
        .iter()
        .filter_map(|rings| {
            let (exterior, interiors) = rings.split_first()?;
            Some(Polygon::new(
                LineString::from(exterior.clone()),
                interiors.iter().cloned().map(LineString::from).collect(),
            ))
        })
        .collect::<Vec<_>>();
    MultiPolygon::new(polygons)
}

/// Bounding box of the footprint, `None` for an empty footprint
pub fn footprint_bounds(footprint: &Footprint) -> Option<BoundingBox> {
    let rect = to_geo_multipolygon(footprint).bounding_rect()?;
    Some(BoundingBox {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lon: rect.min().x,
        max_lon: rect.max().x,
    })
}
