//! Pipeline orchestration.
//!
//! A run moves through target resolution, planning, and then fetches,
//! parses, and writes each planned bucket. Buckets are independent once
//! planned and run with bounded parallelism; pages inside a bucket are
//! fetched strictly in sequence because each depends on the previous
//! page's continuation token.
//!
//! Failure isolation follows the error taxonomy: catalog failures fail only
//! their bucket (unless the run has a single bucket), while index write
//! failures and configuration errors abort the whole run.

use chrono::Utc;
use eeindex_catalog::{CatalogClient, CatalogFilters};
use eeindex_core::config::LayeredConfig;
use eeindex_core::error::{IndexerError, Result};
use eeindex_core::models::{
    derive_product_name, ProductSchema, RawMetadataDocument, WriteMode,
};
use eeindex_core::regions::RegionRegistry;
use eeindex_store::DatasetIndex;
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::{Bucket, BucketReport, BucketStatus, IndexRequest, RunMode, RunReport};
use crate::parser::MetadataParser;
use crate::planner::{PlanRequest, QueryPlanner};
use crate::progress::{IndexEvent, ProgressReporter};
use crate::writer::IndexWriter;

/// Upper bound on concurrently processed buckets
pub const MAX_CONCURRENCY: usize = eeindex_core::config::MAX_CONCURRENCY;

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Buckets processed at once
    pub concurrency: usize,
    /// Catalog page size
    pub page_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            page_size: 500,
        }
    }
}

impl From<&LayeredConfig> for PipelineConfig {
    fn from(config: &LayeredConfig) -> Self {
        Self {
            concurrency: config.concurrency.value,
            page_size: config.page_size.value,
        }
    }
}

/// Product and asset a run works on
#[derive(Debug)]
struct Target {
    product: String,
    asset_id: String,
    schema: Option<ProductSchema>,
}

/// State shared by the buckets of one run
struct RunContext<'a> {
    asset_id: String,
    parser: MetadataParser,
    schema: OnceCell<Arc<ProductSchema>>,
    write_mode: WriteMode,
    page_size: u32,
    /// Child of the caller's token, also cancelled on a fatal error
    abort: CancellationToken,
    fatal: Mutex<Option<IndexerError>>,
    reporter: &'a dyn ProgressReporter,
}

pub struct IndexingPipeline {
    catalog: Arc<dyn CatalogClient>,
    index: Arc<dyn DatasetIndex>,
    planner: QueryPlanner,
    writer: IndexWriter,
    config: PipelineConfig,
}

impl IndexingPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        index: Arc<dyn DatasetIndex>,
        regions: Arc<RegionRegistry>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(catalog.clone(), index.clone(), regions),
            writer: IndexWriter::new(index.clone()),
            catalog,
            index,
            config,
        }
    }

    pub async fn run(
        &self,
        request: IndexRequest,
        cancel: CancellationToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let overrides = request.validate()?;
        self.planner.resolve_spatial(&request.spatial)?;

        let target = self.resolve_target(&request).await?;
        reporter.report(IndexEvent::TargetResolved {
            product: target.product.clone(),
            asset_id: target.asset_id.clone(),
            existing: target.schema.is_some(),
        });
        if target.schema.is_some() && !overrides.is_empty() {
            warn!(
                product = %target.product,
                "Product already exists; resolution and output CRS overrides are ignored"
            );
        }

        let plan = self
            .planner
            .plan(&PlanRequest {
                mode: request.mode,
                product: target.product.clone(),
                asset_id: target.asset_id.clone(),
                explicit_window: request.window,
                spatial: request.spatial.clone(),
                partition_by_year: request.partition_by_year,
                now: started_at,
            })
            .await?;

        let count_before = self.writer.count_for_product(&target.product).await?;
        reporter.report(IndexEvent::PlanReady {
            mode: plan.mode_used,
            window: Some(plan.window),
            buckets: plan.buckets.len(),
            count_before,
        });
        info!(
            product = %target.product,
            asset = %target.asset_id,
            mode = %plan.mode_used,
            window = %plan.window,
            buckets = plan.buckets.len(),
            count_before,
            "Starting indexing run"
        );

        let ctx = RunContext {
            asset_id: target.asset_id.clone(),
            parser: MetadataParser::new(&target.product, &target.asset_id, overrides),
            schema: OnceCell::new_with(target.schema.clone().map(Arc::new)),
            write_mode: request.write_mode,
            page_size: self.config.page_size,
            abort: cancel.child_token(),
            fatal: Mutex::new(None),
            reporter,
        };

        let concurrency = self.config.concurrency.clamp(1, MAX_CONCURRENCY);
        let mut outcomes: Vec<(BucketReport, Option<IndexerError>)> = stream::iter(&plan.buckets)
            .map(|bucket| self.run_bucket(&ctx, bucket))
            .buffer_unordered(concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(report, _)| report.index);

        // Lock poisoning only follows a panic in another bucket.
        if let Some(fatal) = ctx.fatal.lock().unwrap().take() {
            error!(product = %target.product, error = %fatal, "Indexing run aborted");
            return Err(fatal);
        }

        // Without partitioning there is nothing to isolate a failure from.
        if outcomes.len() == 1 {
            if let Some(e) = outcomes[0].1.take() {
                error!(product = %target.product, error = %e, "Indexing run failed");
                return Err(e);
            }
        }

        let buckets: Vec<BucketReport> = outcomes.into_iter().map(|(report, _)| report).collect();
        let count_after = self.writer.count_for_product(&target.product).await?;
        let report = RunReport {
            product: target.product,
            asset_id: target.asset_id,
            mode_used: plan.mode_used,
            window: Some(plan.window),
            count_before,
            count_after,
            written: buckets.iter().map(|b| b.written).sum(),
            dropped: buckets.iter().map(|b| b.dropped).sum(),
            buckets,
            cancelled: cancel.is_cancelled(),
            started_at,
            finished_at: Utc::now(),
        };

        reporter.report(IndexEvent::RunFinished {
            written: report.written,
            dropped: report.dropped,
            failed_buckets: report.failed_buckets().len(),
            cancelled: report.cancelled,
        });
        info!(
            product = %report.product,
            count_before = report.count_before,
            count_after = report.count_after,
            written = report.written,
            dropped = report.dropped,
            failed_buckets = report.failed_buckets().len(),
            cancelled = report.cancelled,
            "Indexing run finished"
        );

        Ok(report)
    }

    /// Synthesize and register a product from the first listing page
    /// without indexing any records.
    pub async fn create_product(&self, request: &IndexRequest) -> Result<ProductSchema> {
        let overrides = request.validate()?;
        let asset_id = request
            .asset_id
            .clone()
            .ok_or_else(|| IndexerError::config("asset", "an asset id is required to create a product"))?;
        let product = request
            .product
            .clone()
            .unwrap_or_else(|| derive_product_name(&asset_id));

        if let Some(existing) = self.index.lookup_product(&product).await? {
            if existing.source_asset != asset_id {
                return Err(IndexerError::config(
                    "product",
                    format!(
                        "product '{}' is already indexed from '{}'",
                        product, existing.source_asset
                    ),
                ));
            }
            info!(%product, "Product already exists");
            return Ok(existing);
        }

        let plan = self
            .planner
            .plan(&PlanRequest {
                mode: RunMode::Full,
                product: product.clone(),
                asset_id: asset_id.clone(),
                explicit_window: request.window,
                spatial: request.spatial.clone(),
                partition_by_year: false,
                now: Utc::now(),
            })
            .await?;
        let bucket = plan.buckets.first().ok_or_else(|| {
            IndexerError::config("time", format!("time range {} is empty", plan.window))
        })?;

        let filters = CatalogFilters {
            window: bucket.window,
            spatial: bucket.spatial.clone(),
            page_size: self.config.page_size,
        };
        let page = self.catalog.fetch_page(&asset_id, &filters, None).await?;
        if page.documents.is_empty() {
            return Err(IndexerError::config(
                "time",
                format!("no items of '{}' found in {}", asset_id, plan.window),
            ));
        }

        let parser = MetadataParser::new(&product, &asset_id, overrides);
        let schema = first_schema(&parser, &page.documents).ok_or_else(|| {
            IndexerError::incomplete(&asset_id, "a complete document on the first listing page")
        })?;

        self.writer.register_product(&schema).await?;
        info!(
            product = %schema.name,
            asset = %schema.source_asset,
            measurements = schema.measurements.len(),
            "Registered product"
        );
        Ok(schema)
    }

    async fn resolve_target(&self, request: &IndexRequest) -> Result<Target> {
        match (request.product.as_deref(), request.asset_id.as_deref()) {
            (None, None) => Err(IndexerError::config(
                "product",
                "supply a product name, an asset id, or both",
            )),
            (Some(product), requested_asset) => {
                let indexed = self.index.resolve_asset_for_product(product).await?;
                let asset_id = match (indexed, requested_asset) {
                    (Some(indexed), Some(requested)) if indexed.asset_id != requested => {
                        return Err(IndexerError::config(
                            "asset",
                            format!(
                                "product '{}' is indexed from '{}', not '{}'",
                                product, indexed.asset_id, requested
                            ),
                        ));
                    }
                    (Some(indexed), _) => indexed.asset_id,
                    (None, Some(requested)) => requested.to_string(),
                    (None, None) => {
                        return Err(IndexerError::ProductNotFound {
                            name: product.to_string(),
                        })
                    }
                };

                Ok(Target {
                    product: product.to_string(),
                    schema: self.index.lookup_product(product).await?,
                    asset_id,
                })
            }
            (None, Some(asset_id)) => {
                let product = derive_product_name(asset_id);
                let schema = self.index.lookup_product(&product).await?;
                if let Some(existing) = &schema {
                    if existing.source_asset != asset_id {
                        return Err(IndexerError::config(
                            "product",
                            format!(
                                "derived product name '{}' already belongs to asset '{}'; supply a product name",
                                product, existing.source_asset
                            ),
                        ));
                    }
                }
                Ok(Target {
                    product,
                    asset_id: asset_id.to_string(),
                    schema,
                })
            }
        }
    }

    async fn run_bucket(
        &self,
        ctx: &RunContext<'_>,
        bucket: &Bucket,
    ) -> (BucketReport, Option<IndexerError>) {
        let mut report = BucketReport::new(bucket);
        if ctx.abort.is_cancelled() {
            return (report, None);
        }

        ctx.reporter.report(IndexEvent::BucketStarted {
            index: bucket.index,
            window: bucket.window,
        });

        match self.process_bucket(ctx, bucket, &mut report).await {
            Ok(true) => {
                report.status = BucketStatus::Succeeded;
                info!(
                    bucket = bucket.index,
                    window = %bucket.window,
                    fetched = report.fetched,
                    written = report.written,
                    dropped = report.dropped,
                    "Bucket finished"
                );
                ctx.reporter.report(IndexEvent::BucketFinished {
                    index: bucket.index,
                    fetched: report.fetched,
                    written: report.written,
                    dropped: report.dropped,
                });
                (report, None)
            }
            Ok(false) => {
                report.status = BucketStatus::Cancelled;
                warn!(bucket = bucket.index, written = report.written, "Bucket interrupted");
                (report, None)
            }
            Err(e) => {
                error!(bucket = bucket.index, window = %bucket.window, error = %e, "Bucket failed");
                report.status = BucketStatus::Failed {
                    reason: e.to_string(),
                };
                ctx.reporter.report(IndexEvent::BucketFailed {
                    index: bucket.index,
                    reason: e.to_string(),
                });

                if e.is_bucket_scoped() {
                    return (report, Some(e));
                }

                ctx.abort.cancel();
                let mut fatal = ctx.fatal.lock().unwrap();
                if fatal.is_none() {
                    *fatal = Some(e);
                }
                (report, None)
            }
        }
    }

    /// Returns `Ok(false)` when the run was cancelled part way through
    async fn process_bucket(
        &self,
        ctx: &RunContext<'_>,
        bucket: &Bucket,
        report: &mut BucketReport,
    ) -> Result<bool> {
        let filters = CatalogFilters {
            window: bucket.window,
            spatial: bucket.spatial.clone(),
            page_size: ctx.page_size,
        };
        let mut page_token: Option<String> = None;

        loop {
            if ctx.abort.is_cancelled() {
                return Ok(false);
            }

            let page = tokio::select! {
                biased;
                _ = ctx.abort.cancelled() => return Ok(false),
                page = self.catalog.fetch_page(&ctx.asset_id, &filters, page_token.as_deref()) => page?,
            };

            let documents = page.documents.len();
            let (written, dropped) = self.index_page(ctx, bucket, &page.documents).await?;
            report.fetched += documents;
            report.written += written;
            report.dropped += dropped;

            ctx.reporter.report(IndexEvent::PageFetched {
                index: bucket.index,
                documents,
                written,
                dropped,
            });

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(true),
            }
        }
    }

    /// Parse and write one page; returns `(written, dropped)`.
    ///
    /// Records acquired outside the bucket window are skipped and counted as
    /// neither. Catalogs that treat the window as closed return items stamped
    /// exactly at its end, which belong to the next bucket.
    async fn index_page(
        &self,
        ctx: &RunContext<'_>,
        bucket: &Bucket,
        documents: &[RawMetadataDocument],
    ) -> Result<(usize, usize)> {
        if documents.is_empty() {
            return Ok((0, 0));
        }

        let schema = match ctx.schema.get() {
            Some(schema) => schema.clone(),
            None => match self.establish_schema(ctx, documents).await? {
                Some(schema) => schema,
                None => {
                    debug!(
                        documents = documents.len(),
                        "No complete document to build the product from; page dropped"
                    );
                    return Ok((0, documents.len()));
                }
            },
        };

        let batch = ctx.parser.parse_batch(documents, Some(&schema));
        let (records, outside): (Vec<_>, Vec<_>) = batch
            .records
            .into_iter()
            .partition(|record| bucket.window.contains(record.acquired_at));
        if !outside.is_empty() {
            debug!(
                bucket = bucket.index,
                window = %bucket.window,
                skipped = outside.len(),
                "Skipped records acquired outside the bucket window"
            );
        }

        let outcome = self.writer.upsert(&records, ctx.write_mode).await?;
        Ok((outcome.written(), batch.dropped.len()))
    }

    /// Synthesize the product from the first complete document and register
    /// it once for the whole run.
    async fn establish_schema(
        &self,
        ctx: &RunContext<'_>,
        documents: &[RawMetadataDocument],
    ) -> Result<Option<Arc<ProductSchema>>> {
        let Some(candidate) = first_schema(&ctx.parser, documents) else {
            return Ok(None);
        };

        let schema = ctx
            .schema
            .get_or_try_init(|| async move {
                self.writer.register_product(&candidate).await?;
                info!(
                    product = %candidate.name,
                    measurements = candidate.measurements.len(),
                    resolution = %candidate.resolution,
                    crs = %candidate.output_crs,
                    "Registered new product"
                );
                Ok::<_, IndexerError>(Arc::new(candidate))
            })
            .await?;
        Ok(Some(schema.clone()))
    }
}

fn first_schema(parser: &MetadataParser, documents: &[RawMetadataDocument]) -> Option<ProductSchema> {
    documents
        .iter()
        .find_map(|doc| parser.parse(doc, None).ok().and_then(|outcome| outcome.synthesized))
}
