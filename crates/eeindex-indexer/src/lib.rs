//! eeindex indexer - Catalog to index pipeline
//!
//! This crate turns catalog listings into dataset index records:
//! - [`parser`]: raw metadata documents to canonical records and product schemas
//! - [`planner`]: time windows, regions, and yearly buckets for a run
//! - [`writer`]: idempotent batch writes keyed by record id
//! - [`pipeline`]: the orchestrator tying them together with cancellation
//!   and per-bucket failure isolation

pub mod models;
pub mod parser;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod writer;

pub use models::{
    Bucket, BucketReport, BucketStatus, IndexRequest, RunMode, RunReport, SpatialRequest,
};
pub use parser::{DroppedRecord, MetadataParser, ParseOutcome, ParsedBatch};
pub use pipeline::{IndexingPipeline, PipelineConfig};
pub use planner::{PlanRequest, QueryPlan, QueryPlanner};
pub use progress::{IndexEvent, ProgressReporter, SilentReporter, TracingReporter};
pub use writer::IndexWriter;

pub use tokio_util::sync::CancellationToken;
