use eeindex_core::error::{IndexerError, Result};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::retry::{AttemptError, RetryPolicy};

/// Connection settings shared by the catalog adapters
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Sent as `Authorization: Bearer ...` when set
    pub bearer_token: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            bearer_token: None,
        }
    }
}

/// GET-and-decode JSON with retry classification
#[derive(Debug, Clone)]
pub(crate) struct JsonTransport {
    client: Client,
    retry: RetryPolicy,
    bearer_token: Option<String>,
}

impl JsonTransport {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout.min(Duration::from_secs(30)))
            .build()
            .map_err(|e| IndexerError::config("http", format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry: settings.retry,
            bearer_token: settings.bearer_token,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let what = url.path().to_string();
        self.retry.run(&what, || self.get_once(url.clone())).await
    }

    async fn get_once<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, AttemptError> {
        debug!(url = %redact(&url), "GET");

        let mut request = self.client.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptError::Transient(describe(&e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AttemptError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Permanent(IndexerError::CatalogRejected {
                status: status.as_u16(),
                reason: truncate(&body, 300),
            }));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transient(describe(&e)))?;

        serde_json::from_slice(&body).map_err(|e| {
            AttemptError::Permanent(IndexerError::CatalogResponseInvalid {
                reason: e.to_string(),
            })
        })
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

/// URL for logging, without the API key
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if pairs.is_empty() {
        return shown.to_string();
    }
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
