//! Query planning: which time windows and area a run fetches

use chrono::{DateTime, Duration, Utc};
use eeindex_catalog::CatalogClient;
use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{SpatialFilter, TimeWindow};
use eeindex_core::regions::RegionRegistry;
use eeindex_store::DatasetIndex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{Bucket, RunMode, SpatialRequest};

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub mode: RunMode,
    pub product: String,
    pub asset_id: String,
    pub explicit_window: Option<TimeWindow>,
    pub spatial: SpatialRequest,
    pub partition_by_year: bool,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// `Full` when a rolling request found no records to continue from
    pub mode_used: RunMode,
    pub window: TimeWindow,
    pub spatial: SpatialFilter,
    pub buckets: Vec<Bucket>,
}

pub struct QueryPlanner {
    catalog: Arc<dyn CatalogClient>,
    index: Arc<dyn DatasetIndex>,
    regions: Arc<RegionRegistry>,
}

impl QueryPlanner {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        index: Arc<dyn DatasetIndex>,
        regions: Arc<RegionRegistry>,
    ) -> Self {
        Self {
            catalog,
            index,
            regions,
        }
    }

    /// Turn a spatial request into a filter; unknown regions are fatal
    pub fn resolve_spatial(&self, spatial: &SpatialRequest) -> Result<SpatialFilter> {
        match spatial {
            SpatialRequest::Everywhere => Ok(SpatialFilter::whole_world()),
            SpatialRequest::Bounds(bounds) => Ok(SpatialFilter::from_bounds(*bounds)),
            SpatialRequest::Region(name) => self.regions.resolve(name),
        }
    }

    pub async fn plan(&self, request: &PlanRequest) -> Result<QueryPlan> {
        // Region lookup happens before any catalog traffic.
        let spatial = self.resolve_spatial(&request.spatial)?;

        let (mode_used, window) = match request.mode {
            RunMode::Rolling => match self.index.latest_record_time(&request.product).await? {
                Some(latest) => {
                    if request.explicit_window.is_some() {
                        info!(
                            product = %request.product,
                            "Ignoring explicit time range; rolling update continues from the latest record"
                        );
                    }
                    (RunMode::Rolling, TimeWindow::since(latest, request.now))
                }
                None => {
                    info!(
                        product = %request.product,
                        "No indexed records; rolling update falls back to a full run"
                    );
                    let window = match request.explicit_window {
                        Some(explicit) => {
                            let end = self.catalog_end(&request.asset_id, request.now).await?;
                            TimeWindow::new(explicit.start(), end.max(explicit.start()))?
                        }
                        None => self.catalog_window(&request.asset_id, request.now).await?,
                    };
                    (RunMode::Full, window)
                }
            },
            RunMode::Full => match request.explicit_window {
                Some(explicit) => (RunMode::Full, explicit),
                None => (
                    RunMode::Full,
                    self.catalog_window(&request.asset_id, request.now).await?,
                ),
            },
        };

        let buckets = partition(&window, &spatial, request.partition_by_year);
        debug!(
            mode = %mode_used,
            %window,
            buckets = buckets.len(),
            "Planned indexing run"
        );

        Ok(QueryPlan {
            mode_used,
            window,
            spatial,
            buckets,
        })
    }

    /// Overall date range the catalog reports for the asset.
    ///
    /// An open-ended collection runs up to `now`; a closed one includes its
    /// last acquisition.
    async fn catalog_window(&self, asset_id: &str, now: DateTime<Utc>) -> Result<TimeWindow> {
        let doc = self.catalog.fetch_one(asset_id).await?;
        let (start, end) = doc.temporal_extent().ok_or_else(|| {
            IndexerError::config(
                "time",
                format!(
                    "asset '{}' reports no date range; supply an explicit time range",
                    asset_id
                ),
            )
        })?;
        let end = end.map(|end| end + Duration::seconds(1)).unwrap_or(now);
        TimeWindow::new(start, end.max(start))
    }

    async fn catalog_end(&self, asset_id: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let doc = self.catalog.fetch_one(asset_id).await?;
        Ok(doc
            .temporal_extent()
            .and_then(|(_, end)| end)
            .map(|end| end + Duration::seconds(1))
            .unwrap_or(now))
    }
}

/// Split a window into buckets, one per calendar year when partitioning
pub fn partition(window: &TimeWindow, spatial: &SpatialFilter, by_year: bool) -> Vec<Bucket> {
    let windows = if by_year {
        window.split_by_year()
    } else if window.is_empty() {
        Vec::new()
    } else {
        vec![*window]
    };

    windows
        .into_iter()
        .enumerate()
        .map(|(index, window)| Bucket {
            index,
            window,
            spatial: spatial.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_partition_by_year() {
        let window = TimeWindow::new(at(2018, 6, 1), at(2020, 3, 1)).unwrap();
        let buckets = partition(&window, &SpatialFilter::whole_world(), true);

        let windows: Vec<_> = buckets.iter().map(|b| (b.window.start(), b.window.end())).collect();
        assert_eq!(
            windows,
            vec![
                (at(2018, 6, 1), at(2019, 1, 1)),
                (at(2019, 1, 1), at(2020, 1, 1)),
                (at(2020, 1, 1), at(2020, 3, 1)),
            ]
        );
        assert_eq!(buckets[2].index, 2);
    }

    #[test]
    fn test_single_bucket_and_empty_window() {
        let window = TimeWindow::new(at(2018, 6, 1), at(2020, 3, 1)).unwrap();
        assert_eq!(partition(&window, &SpatialFilter::whole_world(), false).len(), 1);

        let empty = TimeWindow::new(at(2020, 1, 1), at(2020, 1, 1)).unwrap();
        assert!(partition(&empty, &SpatialFilter::whole_world(), false).is_empty());
        assert!(partition(&empty, &SpatialFilter::whole_world(), true).is_empty());
    }
}
