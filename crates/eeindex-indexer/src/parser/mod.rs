//! Metadata parsing: raw catalog documents to canonical dataset records.
//!
//! Required fields are extracted fail-closed. A document without an
//! acquisition time, a usable footprint, or one of the product's bands is
//! reported as [`IndexerError::MetadataIncomplete`] and dropped from its
//! batch without affecting the rest.

pub mod collections;
pub mod earthengine;
pub mod schema;
pub mod stac;

use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    BoundingBox, CanonicalDatasetRecord, Footprint, ProductOverrides, ProductSchema,
    RawMetadataDocument,
};
use eeindex_geo::{decode_footprint, footprint_bounds};
use serde::Serialize;
use tracing::debug;

use schema::SchemaTarget;

/// Result of parsing one document
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub record: CanonicalDatasetRecord,
    /// Set when no schema was supplied and one was inferred from the document
    pub synthesized: Option<ProductSchema>,
}

/// A document excluded from its batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRecord {
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub records: Vec<CanonicalDatasetRecord>,
    pub dropped: Vec<DroppedRecord>,
    pub synthesized: Option<ProductSchema>,
}

/// Parser bound to one product and its source asset
#[derive(Debug, Clone)]
pub struct MetadataParser {
    product: String,
    asset_id: String,
    overrides: ProductOverrides,
}

impl MetadataParser {
    pub fn new(
        product: impl Into<String>,
        asset_id: impl Into<String>,
        overrides: ProductOverrides,
    ) -> Self {
        Self {
            product: product.into(),
            asset_id: asset_id.into(),
            overrides,
        }
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Infer a product schema from a sample document
    pub fn synthesize(&self, doc: &RawMetadataDocument) -> Result<ProductSchema> {
        let target = SchemaTarget {
            product: &self.product,
            asset_id: &self.asset_id,
            overrides: &self.overrides,
        };
        match doc {
            RawMetadataDocument::EarthEngine(asset) => schema::from_earth_engine(asset, &target),
            RawMetadataDocument::StacItem(item) => schema::from_stac_item(item, &target),
            RawMetadataDocument::StacCollection(collection) => {
                Err(IndexerError::incomplete(&collection.id, "acquisition time"))
            }
        }
    }

    /// Parse one document, synthesizing a schema when none is supplied
    pub fn parse(
        &self,
        doc: &RawMetadataDocument,
        schema: Option<&ProductSchema>,
    ) -> Result<ParseOutcome> {
        match schema {
            Some(schema) => Ok(ParseOutcome {
                record: self.parse_with(doc, schema)?,
                synthesized: None,
            }),
            None => {
                let synthesized = self.synthesize(doc)?;
                let record = self.parse_with(doc, &synthesized)?;
                Ok(ParseOutcome {
                    record,
                    synthesized: Some(synthesized),
                })
            }
        }
    }

    /// Parse a page of documents.
    ///
    /// Without a schema, the first complete document supplies one and every
    /// later document is parsed against it.
    pub fn parse_batch(
        &self,
        docs: &[RawMetadataDocument],
        schema: Option<&ProductSchema>,
    ) -> ParsedBatch {
        let mut batch = ParsedBatch::default();

        for doc in docs {
            let current = schema.or(batch.synthesized.as_ref());
            match self.parse(doc, current) {
                Ok(outcome) => {
                    if outcome.synthesized.is_some() {
                        batch.synthesized = outcome.synthesized;
                    }
                    batch.records.push(outcome.record);
                }
                Err(e) => {
                    debug!(item = doc.item_id(), error = %e, "Dropping document");
                    batch.dropped.push(DroppedRecord {
                        item: doc.item_id().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        batch
    }

    fn parse_with(
        &self,
        doc: &RawMetadataDocument,
        schema: &ProductSchema,
    ) -> Result<CanonicalDatasetRecord> {
        match doc {
            RawMetadataDocument::EarthEngine(asset) => earthengine::parse_image(asset, schema),
            RawMetadataDocument::StacItem(item) => stac::parse_item(item, schema),
            RawMetadataDocument::StacCollection(collection) => {
                Err(IndexerError::incomplete(&collection.id, "acquisition time"))
            }
        }
    }
}

pub(crate) fn decode_geometry(
    item: &str,
    geometry: Option<&serde_json::Value>,
) -> Result<(Footprint, BoundingBox)> {
    let geometry = geometry.ok_or_else(|| IndexerError::incomplete(item, "geometry"))?;
    let footprint = decode_footprint(geometry)
        .map_err(|e| IndexerError::incomplete(item, format!("geometry ({})", e)))?;
    let bounds =
        footprint_bounds(&footprint).ok_or_else(|| IndexerError::incomplete(item, "geometry"))?;
    Ok((footprint, bounds))
}
