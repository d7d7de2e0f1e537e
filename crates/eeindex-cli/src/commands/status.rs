//! Status command implementation

use super::CommandContext;
use crate::cli::StatusArgs;
use crate::storage::Storage;
use anyhow::Result;
use eeindex_core::models::fmt_instant;
use eeindex_core::IndexerError;
use eeindex_store::ProductSummary;
use std::process::ExitCode;
use tabled::Tabled;

#[derive(Tabled)]
struct ProductRow {
    #[tabled(rename = "Product")]
    name: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Records")]
    records: u64,
    #[tabled(rename = "Latest")]
    latest: String,
}

impl From<&ProductSummary> for ProductRow {
    fn from(summary: &ProductSummary) -> Self {
        Self {
            name: summary.name.clone(),
            asset: summary.source_asset.clone(),
            records: summary.record_count,
            latest: summary
                .latest_record_time
                .map(fmt_instant)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub async fn execute(args: StatusArgs, ctx: &CommandContext) -> Result<ExitCode> {
    let storage = Storage::new(ctx.storage).await?;
    ctx.warn_if_ephemeral(&storage);

    let mut products = storage.index.list_products().await?;
    if let Some(name) = &args.product {
        products.retain(|p| &p.name == name);
        if products.is_empty() {
            return Err(IndexerError::ProductNotFound { name: name.clone() }.into());
        }
    }

    if ctx.output.is_json() {
        ctx.output.result(&products)?;
        return Ok(ExitCode::SUCCESS);
    }

    ctx.output.section("Indexed Products");
    ctx.output.table(products.iter().map(ProductRow::from).collect());
    let total: u64 = products.iter().map(|p| p.record_count).sum();
    ctx.output.kv("Products", products.len());
    ctx.output.kv("Records", total);
    Ok(ExitCode::SUCCESS)
}
