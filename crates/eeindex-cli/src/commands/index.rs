//! Index command implementation

use super::{CommandContext, EXIT_CANCELLED};
use crate::cli::IndexArgs;
use crate::output::OutputWriter;
use crate::progress::{BucketProgress, RunSpinner};
use anyhow::{bail, Result};
use dialoguer::Confirm;
use eeindex_core::models::{BoundingBox, WriteMode};
use eeindex_indexer::{
    BucketStatus, CancellationToken, IndexRequest, ProgressReporter, RunMode, RunReport, SpatialRequest,
    TracingReporter,
};
use std::process::ExitCode;
use tabled::Tabled;

pub async fn execute(args: IndexArgs, ctx: &CommandContext) -> Result<ExitCode> {
    let request = build_request(&args)?;
    request.validate()?;

    if !args.no_confirm && !ctx.output.is_json() && console::user_attended() && !confirm(&request)? {
        ctx.output.warning("Aborted; nothing was indexed");
        return Ok(ExitCode::FAILURE);
    }

    let (pipeline, storage) = ctx.pipeline(args.concurrency).await?;
    ctx.warn_if_ephemeral(&storage);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping after in-flight requests");
            signal_token.cancel();
        }
    });

    let reporter: Box<dyn ProgressReporter> = if ctx.output.is_json() {
        Box::new(TracingReporter)
    } else if args.progress {
        Box::new(BucketProgress::new())
    } else {
        Box::new(RunSpinner::new())
    };

    let result = pipeline.run(request, cancel, reporter.as_ref()).await;
    signal_task.abort();
    let report = result?;

    render_report(&report, &ctx.output)?;

    Ok(if report.cancelled {
        ExitCode::from(EXIT_CANCELLED)
    } else if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_request(args: &IndexArgs) -> Result<IndexRequest> {
    if args.product.is_none() && args.asset.is_none() {
        bail!("Either --product or --asset is required");
    }

    let spatial = match (&args.region, &args.latitude, &args.longitude) {
        (Some(region), _, _) => SpatialRequest::Region(region.clone()),
        (None, Some(lat), Some(lon)) => {
            SpatialRequest::Bounds(BoundingBox::from_pairs((lat[0], lat[1]), (lon[0], lon[1]))?)
        }
        _ => SpatialRequest::Everywhere,
    };

    Ok(IndexRequest {
        product: args.product.clone(),
        asset_id: args.asset.clone(),
        mode: if args.rolling { RunMode::Rolling } else { RunMode::Full },
        window: args.time,
        spatial,
        partition_by_year: args.progress,
        write_mode: if args.update {
            WriteMode::Overwrite
        } else {
            WriteMode::InsertOnly
        },
        resolution: args.overrides.resolution(),
        output_crs: args.overrides.output_crs.clone(),
    })
}

fn confirm(request: &IndexRequest) -> Result<bool> {
    println!("\nIndexing Summary\n");
    println!("  Product:   {}", request.product.as_deref().unwrap_or("(derived from asset)"));
    println!("  Asset:     {}", request.asset_id.as_deref().unwrap_or("(registered with product)"));
    println!("  Mode:      {}", request.mode);
    match request.window {
        Some(window) => println!("  Time:      {}", window),
        None => println!("  Time:      full catalog range"),
    }
    match &request.spatial {
        SpatialRequest::Everywhere => println!("  Area:      whole world"),
        SpatialRequest::Bounds(b) => println!(
            "  Area:      lat {}..{}, lon {}..{}",
            b.min_lat, b.max_lat, b.min_lon, b.max_lon
        ),
        SpatialRequest::Region(name) => println!("  Area:      region {}", name),
    }
    if request.write_mode == WriteMode::Overwrite {
        println!("  Existing records will be overwritten");
    }
    println!();

    Ok(Confirm::new().with_prompt("Start indexing?").default(true).interact()?)
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Fetched")]
    fetched: usize,
    #[tabled(rename = "Written")]
    written: usize,
    #[tabled(rename = "Dropped")]
    dropped: usize,
}

fn status_label(status: &BucketStatus) -> String {
    match status {
        BucketStatus::Succeeded => "done".to_string(),
        BucketStatus::Failed { .. } => "failed".to_string(),
        BucketStatus::Cancelled => "cancelled".to_string(),
        BucketStatus::Skipped => "skipped".to_string(),
    }
}

fn render_report(report: &RunReport, output: &OutputWriter) -> Result<()> {
    if output.is_json() {
        return output.result(report);
    }

    output.section("Indexing Summary");
    output.kv("Product", &report.product);
    output.kv("Asset", &report.asset_id);
    output.kv("Mode", report.mode_used);
    output.kv(
        "Window",
        report.window.map(|w| w.to_string()).unwrap_or_else(|| "-".to_string()),
    );
    output.kv("Before", report.count_before);
    output.kv("After", report.count_after);
    output.kv("Written", report.written);
    output.kv("Dropped", report.dropped);

    if report.buckets.len() > 1 {
        output.section("Buckets");
        output.table(
            report
                .buckets
                .iter()
                .map(|b| BucketRow {
                    index: b.index,
                    window: b.window.to_string(),
                    status: status_label(&b.status),
                    fetched: b.fetched,
                    written: b.written,
                    dropped: b.dropped,
                })
                .collect(),
        );
    }

    println!();
    for bucket in report.failed_buckets() {
        if let BucketStatus::Failed { reason } = &bucket.status {
            output.warning(format!("Bucket {} ({}) failed: {}", bucket.index, bucket.window, reason));
        }
    }

    if report.cancelled {
        output.warning("Run cancelled; rerun the same command to resume");
    } else if report.is_success() {
        output.success(format!("Indexed {} new records into {}", report.written, report.product));
    } else {
        output.error(format!(
            "{} bucket(s) failed; rerun to retry them, existing records are skipped",
            report.failed_buckets().len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn index_args(args: &[&str]) -> IndexArgs {
        let argv = ["eeindex", "index"].into_iter().chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Index(args) => args,
            _ => panic!("expected index command"),
        }
    }

    #[test]
    fn test_request_from_flags() {
        let request = build_request(&index_args(&[
            "--product",
            "s1",
            "--rolling",
            "--update",
            "--progress",
            "--latitude",
            "10",
            "-10",
            "--longitude",
            "100",
            "110",
        ]))
        .unwrap();

        assert_eq!(request.mode, RunMode::Rolling);
        assert_eq!(request.write_mode, WriteMode::Overwrite);
        assert!(request.partition_by_year);
        let SpatialRequest::Bounds(bounds) = request.spatial else {
            panic!("expected bounds");
        };
        assert_eq!((bounds.min_lat, bounds.max_lat), (-10.0, 10.0));
    }

    #[test]
    fn test_region_request() {
        let request = build_request(&index_args(&["--asset", "COPERNICUS/S2", "--region", "java"])).unwrap();
        assert_eq!(request.spatial, SpatialRequest::Region("java".into()));
        assert_eq!(request.mode, RunMode::Full);
        assert_eq!(request.write_mode, WriteMode::InsertOnly);
    }

    #[test]
    fn test_target_required() {
        assert!(build_request(&index_args(&["--time", "2020"])).is_err());
    }

    #[test]
    fn test_out_of_range_bounds_rejected() {
        let args = index_args(&["--product", "p", "--latitude", "0", "95", "--longitude", "0", "1"]);
        assert!(build_request(&args).is_err());
    }

    #[test]
    fn test_unpaired_override_rejected_before_io() {
        let request = build_request(&index_args(&["--product", "p", "--resolution", "-30", "30"])).unwrap();
        assert!(request.validate().is_err());
    }
}
