//! eeindex core - Domain models, error taxonomy, and configuration
//!
//! This crate holds the types shared by every stage of the indexing pipeline:
//! time windows, spatial filters, raw catalog documents, canonical dataset
//! records, and product schemas.

pub mod config;
pub mod error;
pub mod models;
pub mod regions;

pub use error::{IndexerError, Result};
