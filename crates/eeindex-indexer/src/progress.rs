//! Progress reporting for indexing runs

use eeindex_core::models::TimeWindow;

use crate::models::RunMode;

/// Events emitted while a run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    TargetResolved {
        product: String,
        asset_id: String,
        existing: bool,
    },
    PlanReady {
        mode: RunMode,
        window: Option<TimeWindow>,
        buckets: usize,
        count_before: u64,
    },
    BucketStarted {
        index: usize,
        window: TimeWindow,
    },
    PageFetched {
        index: usize,
        documents: usize,
        written: usize,
        dropped: usize,
    },
    BucketFinished {
        index: usize,
        fetched: usize,
        written: usize,
        dropped: usize,
    },
    BucketFailed {
        index: usize,
        reason: String,
    },
    RunFinished {
        written: usize,
        dropped: usize,
        failed_buckets: usize,
        cancelled: bool,
    },
}

/// Receives progress events; implementations must be cheap and non-blocking
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: IndexEvent);
}

/// Discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _event: IndexEvent) {}
}

/// Logs events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: IndexEvent) {
        match event {
            IndexEvent::TargetResolved { product, asset_id, existing } => {
                tracing::info!(%product, %asset_id, existing, "Target resolved");
            }
            IndexEvent::PlanReady { mode, buckets, count_before, .. } => {
                tracing::info!(%mode, buckets, count_before, "Plan ready");
            }
            IndexEvent::BucketStarted { index, window } => {
                tracing::debug!(bucket = index, %window, "Bucket started");
            }
            IndexEvent::PageFetched { index, documents, written, .. } => {
                tracing::debug!(bucket = index, documents, written, "Page indexed");
            }
            IndexEvent::BucketFinished { index, fetched, written, dropped } => {
                tracing::info!(bucket = index, fetched, written, dropped, "Bucket finished");
            }
            IndexEvent::BucketFailed { index, reason } => {
                tracing::error!(bucket = index, %reason, "Bucket failed");
            }
            IndexEvent::RunFinished { written, dropped, failed_buckets, cancelled } => {
                tracing::info!(written, dropped, failed_buckets, cancelled, "Run finished");
            }
        }
    }
}
