//! eeindex store - Dataset index port and adapters
//!
//! This crate defines the [`DatasetIndex`](ports::DatasetIndex) port the
//! pipeline writes through, with an in-memory adapter for development and
//! tests and a PostgreSQL adapter for persistent indexes.

pub mod memory;
pub mod ports;
pub mod postgres;

pub use memory::MemoryIndex;
pub use ports::{DatasetIndex, ProductSummary};
