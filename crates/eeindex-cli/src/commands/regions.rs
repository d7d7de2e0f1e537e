use super::CommandContext;
use crate::config_loader::load_regions;
use anyhow::Result;
use eeindex_core::models::BoundingBox;
use serde::Serialize;
use std::process::ExitCode;
use tabled::Tabled;

#[derive(Serialize)]
struct RegionEntry<'a> {
    name: &'a str,
    #[serde(flatten)]
    bounds: &'a BoundingBox,
}

#[derive(Tabled)]
struct RegionRow {
    #[tabled(rename = "Region")]
    name: String,
    #[tabled(rename = "Latitude")]
    latitude: String,
    #[tabled(rename = "Longitude")]
    longitude: String,
}

pub fn execute(ctx: &CommandContext) -> Result<ExitCode> {
    let config = ctx.options.load_config()?;
    let registry = load_regions(&config)?;

    if ctx.output.is_json() {
        let entries: Vec<_> = registry
            .iter()
            .map(|(name, bounds)| RegionEntry { name, bounds })
            .collect();
        ctx.output.result(&entries)?;
        return Ok(ExitCode::SUCCESS);
    }

    if registry.is_empty() {
        ctx.output
            .info("No regions configured; set regions_file in the config file or EEINDEX_REGIONS_FILE");
        return Ok(ExitCode::SUCCESS);
    }

    ctx.output.section("Regions");
    ctx.output.table(
        registry
            .iter()
            .map(|(name, b)| RegionRow {
                name: name.to_string(),
                latitude: format!("{} .. {}", b.min_lat, b.max_lat),
                longitude: format!("{} .. {}", b.min_lon, b.max_lon),
            })
            .collect(),
    );
    Ok(ExitCode::SUCCESS)
}
