use super::CommandContext;
use crate::cli::NewProductArgs;
use anyhow::{Context, Result};
use eeindex_core::models::ProductSchema;
use eeindex_indexer::IndexRequest;
use std::process::ExitCode;
use tabled::Tabled;

#[derive(Tabled)]
struct MeasurementRow {
    #[tabled(rename = "Measurement")]
    name: String,
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Nodata")]
    nodata: String,
    #[tabled(rename = "Units")]
    units: String,
}

pub async fn execute(args: NewProductArgs, ctx: &CommandContext) -> Result<ExitCode> {
    let request = IndexRequest {
        product: args.product,
        asset_id: Some(args.asset.clone()),
        window: args.time,
        resolution: args.overrides.resolution(),
        output_crs: args.overrides.output_crs,
        ..IndexRequest::default()
    };
    request.validate()?;

    let (pipeline, storage) = ctx.pipeline(None).await?;
    ctx.warn_if_ephemeral(&storage);

    let schema = pipeline
        .create_product(&request)
        .await
        .with_context(|| format!("Failed to create a product from {}", args.asset))?;

    if ctx.output.is_json() {
        ctx.output.result(&schema)?;
    } else {
        render_schema(&schema, ctx);
    }
    Ok(ExitCode::SUCCESS)
}

fn render_schema(schema: &ProductSchema, ctx: &CommandContext) {
    let output = &ctx.output;
    output.success(format!("Product {} registered from {}", schema.name, schema.source_asset));

    output.section("Product");
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    output.kv("Platform", or_dash(&schema.metadata.platform));
    output.kv("Instrument", or_dash(&schema.metadata.instrument));
    output.kv("Product type", or_dash(&schema.metadata.product_type));
    output.kv("Resolution", format!("{} x {}", schema.resolution.y, schema.resolution.x));
    output.kv("Output CRS", &schema.output_crs);

    output.section("Measurements");
    output.table(
        schema
            .measurements
            .iter()
            .map(|m| MeasurementRow {
                name: m.name.clone(),
                band: m.band.clone(),
                dtype: m.dtype.clone(),
                nodata: m.nodata.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                units: m.units.clone(),
            })
            .collect(),
    );
}
