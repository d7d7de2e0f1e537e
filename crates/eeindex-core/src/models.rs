pub mod asset;
pub mod document;
pub mod geometry;
pub mod index;
pub mod product;
pub mod record;
pub mod spatial;
pub mod window;

pub use asset::{derive_product_name, AssetReference};
pub use document::{
    parse_timestamp, CatalogProvider, EeAffineTransform, EeAsset, EeBand, EeDataRange, EeDataType,
    EeDimensions, EeGrid, RawMetadataDocument, StacAsset, StacCollection, StacExtent, StacItem,
    StacLink, StacTemporalExtent,
};
pub use geometry::{CornerExtents, Footprint, GridSpec};
pub use index::{UpsertOutcome, WriteMode};
pub use product::{
    MeasurementDefinition, ProductMetadata, ProductOverrides, ProductSchema, Resolution,
};
pub use record::{CanonicalDatasetRecord, MeasurementLocation, RecordId};
pub use spatial::{BoundingBox, SpatialFilter};
pub use window::{fmt_instant, TimeWindow};
