//! Command implementations

mod index;
mod new_product;
mod regions;
mod status;

use crate::cli::{Cli, Commands, StorageBackend};
use crate::config_loader::{load_regions, GlobalOptions};
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::Result;
use eeindex_indexer::{IndexingPipeline, PipelineConfig};
use std::process::ExitCode;
use std::sync::Arc;

/// Exit status of a run interrupted with Ctrl-C
pub const EXIT_CANCELLED: u8 = 130;

/// Everything a command needs besides its own arguments
pub struct CommandContext {
    pub output: OutputWriter,
    pub options: GlobalOptions,
    pub storage: StorageBackend,
}

impl CommandContext {
    /// Open the index and catalog and wire them into a pipeline
    async fn pipeline(&self, concurrency: Option<usize>) -> Result<(IndexingPipeline, Storage)> {
        let config = self.options.clone().with_concurrency(concurrency).load_config()?;
        let regions = Arc::new(load_regions(&config)?);
        let storage = Storage::new(self.storage).await?;
        let catalog = eeindex_catalog::client_from_config(&config)?;

        tracing::debug!(
            catalog = %config.catalog.value,
            url = config.effective_catalog_url(),
            concurrency = config.concurrency.value,
            "Pipeline configured"
        );

        let pipeline = IndexingPipeline::new(
            catalog,
            storage.index.clone(),
            regions,
            PipelineConfig::from(&config),
        );
        Ok((pipeline, storage))
    }

    fn warn_if_ephemeral(&self, storage: &Storage) {
        if storage.is_ephemeral() && !self.output.is_json() {
            self.output
                .info("Using in-memory storage; the index is discarded on exit (use --storage postgres to keep it)");
        }
    }
}

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let ctx = CommandContext {
        output: OutputWriter::new(cli.json),
        options: GlobalOptions::from_cli(&cli),
        storage: cli.storage,
    };

    match cli.command {
        Commands::Index(args) => index::execute(args, &ctx).await,
        Commands::NewProduct(args) => new_product::execute(args, &ctx).await,
        Commands::Status(args) => status::execute(args, &ctx).await,
        Commands::Regions => regions::execute(&ctx),
    }
}
