//! Band aliases and mission metadata for well-known Earth Engine collections

/// A catalog collection whose bands have conventional measurement names
#[derive(Debug)]
pub struct KnownCollection {
    /// Asset id prefixes identifying the collection
    pub prefixes: &'static [&'static str],
    pub platform: &'static str,
    pub instrument: &'static str,
    pub product_type: &'static str,
    /// `(band id, measurement name)` in product order
    pub bands: &'static [(&'static str, &'static str)],
}

impl KnownCollection {
    pub fn alias(&self, band: &str) -> Option<&'static str> {
        self.bands
            .iter()
            .find(|(id, _)| *id == band)
            .map(|(_, name)| *name)
    }
}

const KNOWN: &[KnownCollection] = &[
    KnownCollection {
        prefixes: &["LANDSAT/LC08", "LANDSAT/LC8"],
        platform: "LANDSAT_8",
        instrument: "OLI_TIRS",
        product_type: "LaSRC",
        bands: &[
            ("B1", "coastal_aerosol"),
            ("B2", "blue"),
            ("B3", "green"),
            ("B4", "red"),
            ("B5", "nir"),
            ("B6", "swir1"),
            ("B7", "swir2"),
            ("B10", "lwir1"),
            ("B11", "lwir2"),
            ("pixel_qa", "pixel_qa"),
            ("sr_aerosol", "sr_aerosol"),
            ("radsat_qa", "radsat_qa"),
        ],
    },
    KnownCollection {
        prefixes: &["LANDSAT/LE07", "LANDSAT/LE7"],
        platform: "LANDSAT_7",
        instrument: "ETM",
        product_type: "LEDAPS",
        bands: &[
            ("B1", "blue"),
            ("B2", "green"),
            ("B3", "red"),
            ("B4", "nir"),
            ("B5", "swir1"),
            ("B6", "lwir"),
            ("B7", "swir2"),
            ("sr_atmos_opacity", "sr_atmos_opacity"),
            ("sr_cloud_qa", "sr_cloud_qa"),
            ("pixel_qa", "pixel_qa"),
            ("radsat_qa", "radsat_qa"),
        ],
    },
    KnownCollection {
        prefixes: &["COPERNICUS/S2"],
        platform: "SENTINEL-2",
        instrument: "MSI",
        product_type: "SR",
        bands: &[
            ("B1", "aerosols"),
            ("B2", "blue"),
            ("B3", "green"),
            ("B4", "red"),
            ("B5", "red_edge_1"),
            ("B6", "red_edge_2"),
            ("B7", "red_edge_3"),
            ("B8", "nir"),
            ("B8A", "red_edge_4"),
            ("B9", "water_vapor"),
            ("B11", "swir1"),
            ("B12", "swir2"),
            ("AOT", "aot"),
            ("WVP", "wvp"),
            ("SCL", "scl"),
            ("TCI_R", "tci_r"),
            ("TCI_G", "tci_g"),
            ("TCI_B", "tci_b"),
            ("QA60", "qa60"),
        ],
    },
    KnownCollection {
        prefixes: &["COPERNICUS/S1_GRD"],
        platform: "SENTINEL-1",
        instrument: "Synthetic Aperture Radar",
        product_type: "GRD",
        bands: &[("VV", "vv"), ("VH", "vh")],
    },
    KnownCollection {
        prefixes: &["USGS/SRTMGL1", "CGIAR/SRTM"],
        platform: "STS",
        instrument: "SRTM",
        product_type: "DEM",
        bands: &[("elevation", "elevation")],
    },
    KnownCollection {
        prefixes: &["TRMM/3B42"],
        platform: "TRMM",
        instrument: "TRMM",
        product_type: "TRMM",
        bands: &[
            ("precipitation", "precipitation"),
            ("relativeError", "relativeError"),
            ("gaugeRelativeWeighting", "gaugeRelativeWeighting"),
        ],
    },
    KnownCollection {
        prefixes: &["NASA_USDA/HSL/SMAP"],
        platform: "SMAP",
        instrument: "SMAP",
        product_type: "SMAP",
        bands: &[
            ("ssm", "ssm"),
            ("susm", "susm"),
            ("smp", "smp"),
            ("ssma", "ssma"),
            ("susma", "susma"),
        ],
    },
    KnownCollection {
        prefixes: &["WorldPop/"],
        platform: "WORLDPOP",
        instrument: "WORLDPOP",
        product_type: "WORLDPOP",
        bands: &[("population", "population")],
    },
];

/// Known collection an asset id belongs to, if any
pub fn lookup(asset_id: &str) -> Option<&'static KnownCollection> {
    KNOWN
        .iter()
        .find(|known| known.prefixes.iter().any(|prefix| asset_id.starts_with(prefix)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_prefix() {
        let ls8 = lookup("LANDSAT/LC08/C01/T1_SR").unwrap();
        assert_eq!(ls8.platform, "LANDSAT_8");
        assert_eq!(ls8.alias("B4"), Some("red"));

        let ls7 = lookup("LANDSAT/LE07/C01/T1_SR").unwrap();
        assert_eq!(ls7.alias("B4"), Some("nir"));

        assert_eq!(lookup("COPERNICUS/S1_GRD").unwrap().alias("VH"), Some("vh"));
        assert!(lookup("MODIS/006/MOD13Q1").is_none());
    }
}
