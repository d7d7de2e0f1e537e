//! eeindex catalog - Remote catalog access
//!
//! Defines the [`CatalogClient`](ports::CatalogClient) port and the HTTP
//! adapters for the Earth Engine REST API and STAC APIs. Transport failures
//! are retried with exponential backoff; malformed payloads are not.

pub mod earthengine;
mod http;
pub mod ports;
pub mod retry;
pub mod stac;

pub use earthengine::EarthEngineClient;
pub use http::HttpSettings;
pub use ports::{CatalogClient, CatalogFilters, CatalogPage};
pub use retry::RetryPolicy;
pub use stac::StacClient;

use eeindex_core::config::LayeredConfig;
use eeindex_core::models::CatalogProvider;
use eeindex_core::Result;
use std::sync::Arc;

/// Build the catalog adapter selected by the configuration
pub fn client_from_config(config: &LayeredConfig) -> Result<Arc<dyn CatalogClient>> {
    let settings = HttpSettings {
        timeout: config.request_timeout(),
        retry: RetryPolicy {
            max_retries: config.max_retries.value,
            initial_delay: config.initial_retry_delay(),
            max_delay: config.max_retry_delay(),
        },
        bearer_token: config.bearer_token.value.clone(),
    };

    let client: Arc<dyn CatalogClient> = match config.catalog.value {
        CatalogProvider::EarthEngine => Arc::new(
            EarthEngineClient::new(
                config.effective_catalog_url(),
                config.project.value.clone(),
                settings,
            )?
            .with_api_key(config.api_key.value.clone()),
        ),
        CatalogProvider::Stac => Arc::new(StacClient::new(config.effective_catalog_url(), settings)?),
    };

    Ok(client)
}
