use crate::error::{IndexerError, Result};
use crate::models::CatalogProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EARTH_ENGINE_URL: &str = "https://earthengine.googleapis.com/v1alpha";
pub const EARTH_ENGINE_PROJECT: &str = "earthengine-public";
pub const STAC_URL: &str = "https://earth-search.aws.element84.com/v1";

/// Upper bound on concurrently processed buckets
pub const MAX_CONCURRENCY: usize = 4;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered indexer configuration: defaults < file < environment < CLI
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub catalog: ConfigValue<CatalogProvider>,
    pub catalog_url: ConfigValue<String>,
    pub project: ConfigValue<String>,
    pub api_key: ConfigValue<Option<String>>,
    pub bearer_token: ConfigValue<Option<String>>,
    pub regions_file: ConfigValue<Option<PathBuf>>,
    pub page_size: ConfigValue<u32>,
    pub concurrency: ConfigValue<usize>,
    pub max_retries: ConfigValue<u32>,
    pub initial_retry_delay_ms: ConfigValue<u64>,
    pub max_retry_delay_ms: ConfigValue<u64>,
    pub request_timeout_secs: ConfigValue<u64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            catalog: ConfigValue::new(CatalogProvider::EarthEngine, ConfigSource::Default),
            catalog_url: ConfigValue::new(EARTH_ENGINE_URL.to_string(), ConfigSource::Default),
            project: ConfigValue::new(EARTH_ENGINE_PROJECT.to_string(), ConfigSource::Default),
            api_key: ConfigValue::new(None, ConfigSource::Default),
            bearer_token: ConfigValue::new(None, ConfigSource::Default),
            regions_file: ConfigValue::new(None, ConfigSource::Default),
            page_size: ConfigValue::new(500, ConfigSource::Default),
            concurrency: ConfigValue::new(1, ConfigSource::Default),
            max_retries: ConfigValue::new(5, ConfigSource::Default),
            initial_retry_delay_ms: ConfigValue::new(2_000, ConfigSource::Default),
            max_retry_delay_ms: ConfigValue::new(120_000, ConfigSource::Default),
            request_timeout_secs: ConfigValue::new(60, ConfigSource::Default),
        }
    }

    /// Defaults, then the config file, then the environment.
    ///
    /// An explicitly named file must exist; the default location is skipped
    /// when absent.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::with_defaults();

        match explicit_file {
            Some(path) => config = config.load_from_file(path)?,
            None => {
                if let Some(path) = default_config_path().filter(|p| p.exists()) {
                    tracing::debug!(path = %path.display(), "Loading config file");
                    config = config.load_from_file(&path)?;
                }
            }
        }

        Ok(config.load_from_env())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            IndexerError::config(
                "file",
                format!("Failed to read config file {}: {}", path.as_ref().display(), e),
            )
        })?;

        let file_config: FileConfig = toml::from_str(&content)
            .map_err(|e| IndexerError::config("file", format!("Failed to parse TOML: {}", e)))?;

        if let Some(catalog) = file_config.catalog {
            self.catalog.update(catalog, ConfigSource::File);
        }
        if let Some(url) = file_config.catalog_url {
            self.catalog_url.update(url, ConfigSource::File);
        }
        if let Some(project) = file_config.project {
            self.project.update(project, ConfigSource::File);
        }
        if let Some(key) = file_config.api_key {
            self.api_key.update(Some(key), ConfigSource::File);
        }
        if let Some(token) = file_config.bearer_token {
            self.bearer_token.update(Some(token), ConfigSource::File);
        }
        if let Some(regions) = file_config.regions_file {
            self.regions_file.update(Some(regions), ConfigSource::File);
        }
        if let Some(page_size) = file_config.page_size {
            self.page_size.update(page_size, ConfigSource::File);
        }
        if let Some(concurrency) = file_config.concurrency {
            self.concurrency.update(concurrency, ConfigSource::File);
        }
        if let Some(retries) = file_config.max_retries {
            self.max_retries.update(retries, ConfigSource::File);
        }
        if let Some(delay) = file_config.initial_retry_delay_ms {
            self.initial_retry_delay_ms.update(delay, ConfigSource::File);
        }
        if let Some(delay) = file_config.max_retry_delay_ms {
            self.max_retry_delay_ms.update(delay, ConfigSource::File);
        }
        if let Some(timeout) = file_config.request_timeout_secs {
            self.request_timeout_secs.update(timeout, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(catalog) = env::var("EEINDEX_CATALOG") {
            match parse_catalog_provider(&catalog) {
                Ok(provider) => self.catalog.update(provider, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid EEINDEX_CATALOG value '{}': expected earthengine or stac",
                    catalog
                ),
            }
        }

        if let Ok(url) = env::var("EEINDEX_CATALOG_URL") {
            self.catalog_url.update(url, ConfigSource::Environment);
        }

        if let Ok(project) = env::var("EEINDEX_PROJECT") {
            self.project.update(project, ConfigSource::Environment);
        }

        if let Ok(key) = env::var("EE_API_KEY") {
            self.api_key.update(Some(key), ConfigSource::Environment);
        }

        if let Ok(token) = env::var("EEDA_BEARER") {
            self.bearer_token.update(Some(token), ConfigSource::Environment);
        }

        if let Ok(path) = env::var("EEINDEX_REGIONS_FILE") {
            self.regions_file.update(Some(PathBuf::from(path)), ConfigSource::Environment);
        }

        read_env_number("EEINDEX_PAGE_SIZE", &mut self.page_size);
        read_env_number("EEINDEX_CONCURRENCY", &mut self.concurrency);
        read_env_number("EEINDEX_MAX_RETRIES", &mut self.max_retries);
        read_env_number("EEINDEX_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs);

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(catalog) = overrides.catalog {
            self.catalog.update(catalog, ConfigSource::Cli);
        }
        if let Some(url) = overrides.catalog_url {
            self.catalog_url.update(url, ConfigSource::Cli);
        }
        if let Some(regions) = overrides.regions_file {
            self.regions_file.update(Some(regions), ConfigSource::Cli);
        }
        if let Some(page_size) = overrides.page_size {
            self.page_size.update(page_size, ConfigSource::Cli);
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency.update(concurrency, ConfigSource::Cli);
        }
    }

    /// Catalog base URL, falling back to the provider's public endpoint
    pub fn effective_catalog_url(&self) -> &str {
        match (self.catalog.value, self.catalog_url.source) {
            (CatalogProvider::Stac, ConfigSource::Default) => STAC_URL,
            _ => self.catalog_url.value.trim_end_matches('/'),
        }
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms.value)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms.value)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    /// Check value ranges; called once all layers are applied
    pub fn validate(&self) -> Result<()> {
        if self.effective_catalog_url().trim().is_empty() {
            return Err(IndexerError::config("catalog_url", "cannot be empty"));
        }
        if self.page_size.value == 0 {
            return Err(IndexerError::config("page_size", "must be greater than 0"));
        }
        if self.concurrency.value == 0 || self.concurrency.value > MAX_CONCURRENCY {
            return Err(IndexerError::config(
                "concurrency",
                format!(
                    "{} is outside the supported range 1-{}",
                    self.concurrency.value, MAX_CONCURRENCY
                ),
            ));
        }
        if self.max_retry_delay_ms.value < self.initial_retry_delay_ms.value {
            return Err(IndexerError::config(
                "max_retry_delay_ms",
                "cannot be smaller than initial_retry_delay_ms",
            ));
        }
        if self.request_timeout_secs.value == 0 {
            return Err(IndexerError::config("request_timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }

    /// Get all configuration values as a map for inspection; secrets are masked
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("catalog".to_string(), (self.catalog.value.to_string(), self.catalog.source));
        map.insert(
            "catalog_url".to_string(),
            (self.effective_catalog_url().to_string(), self.catalog_url.source),
        );
        map.insert("project".to_string(), (self.project.value.clone(), self.project.source));
        map.insert("api_key".to_string(), (mask(&self.api_key.value), self.api_key.source));
        map.insert(
            "bearer_token".to_string(),
            (mask(&self.bearer_token.value), self.bearer_token.source),
        );
        map.insert(
            "regions_file".to_string(),
            (
                self.regions_file
                    .value
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string()),
                self.regions_file.source,
            ),
        );
        map.insert("page_size".to_string(), (self.page_size.value.to_string(), self.page_size.source));
        map.insert(
            "concurrency".to_string(),
            (self.concurrency.value.to_string(), self.concurrency.source),
        );
        map.insert(
            "max_retries".to_string(),
            (self.max_retries.value.to_string(), self.max_retries.source),
        );

        map
    }
}

fn mask(secret: &Option<String>) -> String {
    match secret {
        Some(_) => "********".to_string(),
        None => "(not set)".to_string(),
    }
}

fn read_env_number<T: std::str::FromStr>(name: &str, target: &mut ConfigValue<T>) {
    if let Ok(raw) = env::var(name) {
        match raw.trim().parse::<T>() {
            Ok(value) => target.update(value, ConfigSource::Environment),
            Err(_) => tracing::warn!("Invalid {} value '{}': expected a positive integer", name, raw),
        }
    }
}

/// `$EEINDEX_CONFIG`, else `$HOME/.config/eeindex/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("EEINDEX_CONFIG") {
        return Some(PathBuf::from(path));
    }
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/eeindex/config.toml"))
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    catalog: Option<CatalogProvider>,
    catalog_url: Option<String>,
    project: Option<String>,
    api_key: Option<String>,
    bearer_token: Option<String>,
    regions_file: Option<PathBuf>,
    page_size: Option<u32>,
    concurrency: Option<usize>,
    max_retries: Option<u32>,
    initial_retry_delay_ms: Option<u64>,
    max_retry_delay_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub catalog: Option<CatalogProvider>,
    pub catalog_url: Option<String>,
    pub regions_file: Option<PathBuf>,
    pub page_size: Option<u32>,
    pub concurrency: Option<usize>,
}

/// Parse catalog provider from string
pub fn parse_catalog_provider(s: &str) -> Result<CatalogProvider> {
    match s.trim().to_lowercase().as_str() {
        "earthengine" | "ee" | "gee" => Ok(CatalogProvider::EarthEngine),
        "stac" => Ok(CatalogProvider::Stac),
        _ => Err(IndexerError::config(
            "catalog",
            format!("Invalid catalog: {}. Use earthengine or stac", s),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.catalog.value, CatalogProvider::EarthEngine);
        assert_eq!(config.catalog.source, ConfigSource::Default);
        assert_eq!(config.effective_catalog_url(), EARTH_ENGINE_URL);
        assert_eq!(config.page_size.value, 500);
        assert_eq!(config.concurrency.value, 1);
        assert_eq!(config.max_retries.value, 5);
        assert_eq!(config.initial_retry_delay(), Duration::from_secs(2));
        assert_eq!(config.max_retry_delay(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
catalog = "stac"
page_size = 100
concurrency = 3
regions_file = "/etc/eeindex/regions.toml"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.catalog.value, CatalogProvider::Stac);
        assert_eq!(config.catalog.source, ConfigSource::File);
        assert_eq!(config.effective_catalog_url(), STAC_URL);
        assert_eq!(config.page_size.value, 100);
        assert_eq!(config.concurrency.value, 3);
        assert_eq!(
            config.regions_file.value.as_deref(),
            Some(Path::new("/etc/eeindex/regions.toml"))
        );
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = LayeredConfig::with_defaults().load_from_file("/nonexistent/eeindex.toml");
        assert!(matches!(result, Err(IndexerError::Configuration { .. })));
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            concurrency: Some(MAX_CONCURRENCY + 1),
            ..Default::default()
        });
        assert!(config.validate().is_err());

        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            concurrency: Some(0),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_url_wins_for_stac() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            catalog: Some(CatalogProvider::Stac),
            catalog_url: Some("http://localhost:8080/".to_string()),
            ..Default::default()
        });
        assert_eq!(config.effective_catalog_url(), "http://localhost:8080");
    }

    #[test]
    fn test_parse_catalog_provider() {
        assert_eq!(parse_catalog_provider("earthengine").unwrap(), CatalogProvider::EarthEngine);
        assert_eq!(parse_catalog_provider("GEE").unwrap(), CatalogProvider::EarthEngine);
        assert_eq!(parse_catalog_provider("stac").unwrap(), CatalogProvider::Stac);
        assert!(parse_catalog_provider("s3").is_err());
    }

    #[test]
    fn test_inspection_map_masks_secrets() {
        let mut config = LayeredConfig::with_defaults();
        config.api_key.update(Some("AIza-secret".to_string()), ConfigSource::Cli);
        let map = config.to_inspection_map();

        let (api_key, source) = &map["api_key"];
        assert_eq!(api_key, "********");
        assert_eq!(*source, ConfigSource::Cli);
        assert_eq!(map["bearer_token"].0, "(not set)");
    }
}
