//! eeindex geo - Footprint decoding, validation, and bounds
//!
//! Catalog footprints arrive as loosely-typed GeoJSON. This crate turns them
//! into validated [`Footprint`](eeindex_core::models::Footprint) values and
//! derives the bounds and corner extents records are keyed on.

pub mod footprint;
pub mod validation;

pub use footprint::{decode_footprint, footprint_bounds, to_geo_multipolygon, FootprintError};
pub use validation::{validate_footprint, ValidationError, ValidationResult};
