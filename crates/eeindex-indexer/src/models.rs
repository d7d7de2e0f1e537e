use chrono::{DateTime, Utc};
use eeindex_core::error::Result;
use eeindex_core::models::{BoundingBox, ProductOverrides, TimeWindow, WriteMode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which time range an indexing run covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Everything the catalog reports, optionally bounded by an explicit window
    #[default]
    Full,
    /// Only items newer than the latest indexed record
    Rolling,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Full => write!(f, "full"),
            RunMode::Rolling => write!(f, "rolling"),
        }
    }
}

/// Spatial restriction as requested, before region lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SpatialRequest {
    #[default]
    Everywhere,
    Bounds(BoundingBox),
    Region(String),
}

/// One indexing invocation
#[derive(Debug, Clone, Default)]
pub struct IndexRequest {
    pub product: Option<String>,
    pub asset_id: Option<String>,
    pub mode: RunMode,
    pub window: Option<TimeWindow>,
    pub spatial: SpatialRequest,
    pub partition_by_year: bool,
    pub write_mode: WriteMode,
    pub resolution: Option<(f64, f64)>,
    pub output_crs: Option<String>,
}

impl IndexRequest {
    pub fn for_product(product: impl Into<String>) -> Self {
        Self {
            product: Some(product.into()),
            ..Default::default()
        }
    }

    pub fn for_asset(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: Some(asset_id.into()),
            ..Default::default()
        }
    }

    /// Check the inputs that need no I/O; returns the schema overrides
    pub fn validate(&self) -> Result<ProductOverrides> {
        ProductOverrides::new(self.resolution, self.output_crs.clone())
    }
}

/// One time-bounded slice of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub index: usize,
    pub window: TimeWindow,
    pub spatial: eeindex_core::models::SpatialFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BucketStatus {
    Succeeded,
    Failed { reason: String },
    /// Interrupted part way through
    Cancelled,
    /// Never started
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketReport {
    pub index: usize,
    pub window: TimeWindow,
    #[serde(flatten)]
    pub status: BucketStatus,
    pub fetched: usize,
    pub written: usize,
    pub dropped: usize,
}

impl BucketReport {
    pub(crate) fn new(bucket: &Bucket) -> Self {
        Self {
            index: bucket.index,
            window: bucket.window,
            status: BucketStatus::Skipped,
            fetched: 0,
            written: 0,
            dropped: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, BucketStatus::Failed { .. })
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub product: String,
    pub asset_id: String,
    pub mode_used: RunMode,
    pub window: Option<TimeWindow>,
    pub count_before: u64,
    pub count_after: u64,
    pub written: usize,
    pub dropped: usize,
    pub buckets: Vec<BucketReport>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn failed_buckets(&self) -> Vec<&BucketReport> {
        self.buckets.iter().filter(|b| b.is_failed()).collect()
    }

    /// Done with no failed buckets and not interrupted
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.buckets.iter().all(|b| !b.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeindex_core::models::SpatialFilter;
    use eeindex_core::IndexerError;

    #[test]
    fn test_validate_requires_matched_overrides() {
        let mut request = IndexRequest::for_asset("LANDSAT/LC08/C01/T1_SR");
        assert!(request.validate().unwrap().is_empty());

        request.resolution = Some((-30.0, 30.0));
        assert!(matches!(
            request.validate(),
            Err(IndexerError::Configuration { .. })
        ));

        request.output_crs = Some("EPSG:32610".to_string());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_report_success() {
        let window = TimeWindow::parse("2019").unwrap();
        let bucket = Bucket {
            index: 0,
            window,
            spatial: SpatialFilter::whole_world(),
        };
        let mut ok = BucketReport::new(&bucket);
        ok.status = BucketStatus::Succeeded;
        let mut failed = BucketReport::new(&bucket);
        failed.status = BucketStatus::Failed {
            reason: "catalog unavailable".to_string(),
        };

        let now = Utc::now();
        let mut report = RunReport {
            product: "p".to_string(),
            asset_id: "A".to_string(),
            mode_used: RunMode::Full,
            window: Some(window),
            count_before: 0,
            count_after: 0,
            written: 0,
            dropped: 0,
            buckets: vec![ok.clone()],
            cancelled: false,
            started_at: now,
            finished_at: now,
        };
        assert!(report.is_success());

        report.buckets.push(failed);
        assert!(!report.is_success());
        assert_eq!(report.failed_buckets().len(), 1);
    }
}
