use serde::{Deserialize, Serialize};
use serde_json::json;

use super::spatial::BoundingBox;

/// Ground footprint of an image as `[lon, lat]` polygons.
///
/// Stored with MultiPolygon nesting (polygons → rings → positions) so single
/// and multi-part footprints share one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub polygons: Vec<Vec<Vec<[f64; 2]>>>,
}

impl Footprint {
    pub fn from_polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Self {
            polygons: vec![rings],
        }
    }

    /// Every position of every ring
    pub fn positions(&self) -> impl Iterator<Item = &[f64; 2]> {
        self.polygons.iter().flatten().flatten()
    }

    /// GeoJSON geometry; a single polygon is written as `Polygon`
    pub fn to_geojson(&self) -> serde_json::Value {
        match self.polygons.as_slice() {
            [single] => json!({ "type": "Polygon", "coordinates": single }),
            many => json!({ "type": "MultiPolygon", "coordinates": many }),
        }
    }
}

/// Corner coordinates of a footprint's bounding box, `[lon, lat]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerExtents {
    pub ul: [f64; 2],
    pub ur: [f64; 2],
    pub ll: [f64; 2],
    pub lr: [f64; 2],
}

impl From<&BoundingBox> for CornerExtents {
    fn from(bounds: &BoundingBox) -> Self {
        Self {
            ul: [bounds.min_lon, bounds.max_lat],
            ur: [bounds.max_lon, bounds.max_lat],
            ll: [bounds.min_lon, bounds.min_lat],
            lr: [bounds.max_lon, bounds.min_lat],
        }
    }
}

/// Pixel grid of one or more bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// `[height, width]` in pixels
    pub shape: [u64; 2],

    /// Affine coefficients `[scale_x, shear_x, translate_x, shear_y, scale_y, translate_y]`
    pub transform: [f64; 6],

    pub crs: Option<String>,
}

impl GridSpec {
    /// Pixel spacing along x, in CRS units
    pub fn spacing(&self) -> f64 {
        self.transform[0].abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_extents() {
        let bounds = BoundingBox::from_pairs((-2.0, 3.0), (10.0, 12.0)).unwrap();
        let corners = CornerExtents::from(&bounds);
        assert_eq!(corners.ul, [10.0, 3.0]);
        assert_eq!(corners.lr, [12.0, -2.0]);
    }

    #[test]
    fn test_single_polygon_geojson() {
        let ring = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let footprint = Footprint::from_polygon(vec![ring]);
        assert_eq!(footprint.to_geojson()["type"], "Polygon");
        assert_eq!(footprint.positions().count(), 4);
    }
}
