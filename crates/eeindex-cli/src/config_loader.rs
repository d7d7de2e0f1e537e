//! Configuration and region registry loading for commands

use crate::cli::Cli;
use anyhow::{Context, Result};
use eeindex_core::config::{CliConfigOverrides, LayeredConfig};
use eeindex_core::regions::RegionRegistry;

/// Global options every command needs after parsing
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_file: Option<std::path::PathBuf>,
    pub overrides: CliOverrides,
}

/// Values the command line can set on top of file and environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub catalog: Option<eeindex_core::models::CatalogProvider>,
    pub concurrency: Option<usize>,
}

impl GlobalOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config_file: cli.config.clone(),
            overrides: CliOverrides {
                catalog: cli.catalog,
                concurrency: None,
            },
        }
    }

    pub fn with_concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.overrides.concurrency = concurrency;
        self
    }

    /// Defaults < file < environment < command line, then validated
    pub fn load_config(&self) -> Result<LayeredConfig> {
        let mut config = LayeredConfig::load(self.config_file.as_deref())
            .context("Failed to load configuration")?;

        config.update_from_cli(CliConfigOverrides {
            catalog: self.overrides.catalog,
            concurrency: self.overrides.concurrency,
            ..Default::default()
        });
        config.validate()?;

        let mut entries: Vec<_> = config.to_inspection_map().into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, (value, source)) in entries {
            tracing::trace!(%key, %value, ?source, "Effective configuration");
        }

        Ok(config)
    }
}

/// Region registry named by the configuration; empty when none is configured
pub fn load_regions(config: &LayeredConfig) -> Result<RegionRegistry> {
    match &config.regions_file.value {
        Some(path) => RegionRegistry::load(path)
            .with_context(|| format!("Failed to load regions from {}", path.display())),
        None => Ok(RegionRegistry::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_regions_from_config() {
        let mut regions = NamedTempFile::new().unwrap();
        writeln!(regions, "[regions.java]\nlatitude = [-8.8, -5.9]\nlongitude = [105.0, 114.6]").unwrap();

        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            regions_file: Some(regions.path().to_path_buf()),
            ..Default::default()
        });

        let registry = load_regions(&config).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["java"]);
    }

    #[test]
    fn test_no_regions_file_configured() {
        let registry = load_regions(&LayeredConfig::with_defaults()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrency_override_is_validated() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "page_size = 100").unwrap();

        let options = GlobalOptions {
            config_file: Some(file.path().to_path_buf()),
            overrides: CliOverrides {
                catalog: None,
                concurrency: Some(9),
            },
        };
        assert!(options.load_config().is_err());

        let options = options.with_concurrency(Some(3));
        let config = options.load_config().unwrap();
        assert_eq!(config.concurrency.value, 3);
        assert_eq!(config.page_size.value, 100);
    }
}
