use clap::{Args, Parser, Subcommand};
use eeindex_core::config::parse_catalog_provider;
use eeindex_core::models::{CatalogProvider, TimeWindow};
use std::path::PathBuf;

/// eeindex - index satellite imagery catalogs into a spatial-temporal dataset index
#[derive(Parser, Debug)]
#[command(name = "eeindex")]
#[command(about = "Index satellite imagery catalog metadata", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Storage backend to use (memory or postgres)
    #[arg(long, global = true, default_value = "memory")]
    pub storage: StorageBackend,

    /// Catalog to query (earthengine or stac)
    #[arg(long, global = true, value_parser = parse_catalog)]
    pub catalog: Option<CatalogProvider>,

    /// Configuration file (defaults to $EEINDEX_CONFIG or ~/.config/eeindex/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageBackend {
    /// In-memory index (default, contents are lost on exit)
    Memory,
    /// PostgreSQL persistent index
    Postgres,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index catalog items for a product
    Index(IndexArgs),

    /// Register a product schema synthesized from a catalog asset
    NewProduct(NewProductArgs),

    /// Show indexed products
    Status(StatusArgs),

    /// List configured named regions
    Regions,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Product name in the index
    #[arg(long)]
    pub product: Option<String>,

    /// Catalog asset id (e.g. COPERNICUS/S1_GRD)
    #[arg(long)]
    pub asset: Option<String>,

    /// Time period (2020, 2020-01, 2020-01-15) or interval START/END
    #[arg(long, value_parser = parse_window)]
    pub time: Option<TimeWindow>,

    /// Latitude bounds
    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        allow_negative_numbers = true,
        requires = "longitude"
    )]
    pub latitude: Option<Vec<f64>>,

    /// Longitude bounds
    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        allow_negative_numbers = true,
        requires = "latitude"
    )]
    pub longitude: Option<Vec<f64>>,

    /// Named region from the regions file
    #[arg(long, conflicts_with_all = ["latitude", "longitude"])]
    pub region: Option<String>,

    /// Only index items newer than the latest indexed record
    #[arg(long)]
    pub rolling: bool,

    /// Split the run into yearly buckets and show per-bucket progress
    #[arg(long)]
    pub progress: bool,

    /// Overwrite records that are already indexed
    #[arg(long)]
    pub update: bool,

    #[command(flatten)]
    pub overrides: SchemaOverrideArgs,

    /// Buckets processed concurrently (1-4)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub no_confirm: bool,
}

#[derive(Args, Debug)]
pub struct NewProductArgs {
    /// Catalog asset id to synthesize the product from
    #[arg(long)]
    pub asset: String,

    /// Product name (derived from the asset id when omitted)
    #[arg(long)]
    pub product: Option<String>,

    /// Time period used to find a sample item
    #[arg(long, value_parser = parse_window)]
    pub time: Option<TimeWindow>,

    #[command(flatten)]
    pub overrides: SchemaOverrideArgs,
}

/// Resolution and output CRS, given together or not at all
#[derive(Args, Debug, Default)]
pub struct SchemaOverrideArgs {
    /// Output resolution in CRS units
    #[arg(
        long,
        num_args = 2,
        value_names = ["Y", "X"],
        allow_negative_numbers = true
    )]
    pub resolution: Option<Vec<f64>>,

    /// Output CRS (e.g. EPSG:4326)
    #[arg(long, value_name = "CRS")]
    pub output_crs: Option<String>,
}

impl SchemaOverrideArgs {
    pub fn resolution(&self) -> Option<(f64, f64)> {
        self.resolution.as_deref().map(|r| (r[0], r[1]))
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show this product
    #[arg(long)]
    pub product: Option<String>,
}

fn parse_window(value: &str) -> Result<TimeWindow, String> {
    TimeWindow::parse(value).map_err(|e| e.to_string())
}

fn parse_catalog(value: &str) -> Result<CatalogProvider, String> {
    parse_catalog_provider(value).map_err(|e| e.to_string())
}
