use eeindex_core::error::{IndexerError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff for catalog requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (doubles each retry)
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
        }
    }
}

/// Outcome of a single failed attempt
#[derive(Debug)]
pub enum AttemptError {
    /// Network failure, timeout, 429 or 5xx; worth retrying
    Transient(String),
    /// Anything retrying cannot fix
    Permanent(IndexerError),
}

impl RetryPolicy {
    /// No retries, for tests and one-shot requests
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent. Exhaustion is reported as `CatalogUnavailable`.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let mut retry = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Permanent(e)) => return Err(e),
                Err(AttemptError::Transient(reason)) => {
                    retry += 1;

                    if retry > self.max_retries {
                        return Err(IndexerError::CatalogUnavailable {
                            attempts: retry,
                            reason,
                        });
                    }

                    let delay = self.delay_for(retry);
                    warn!(
                        error = %reason,
                        request = what,
                        retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Catalog request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(32));
        assert_eq!(policy.delay_for(7), Duration::from_secs(120));
        assert_eq!(policy.delay_for(40), Duration::from_secs(120));
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast(3)
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AttemptError::Transient("HTTP 503".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast(2)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::Transient("connection refused".to_string()))
            })
            .await;

        match result {
            Err(IndexerError::CatalogUnavailable { attempts, reason }) => {
                assert_eq!(attempts, 3);
                assert_eq!(reason, "connection refused");
            }
            other => panic!("expected CatalogUnavailable, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast(5)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::Permanent(IndexerError::CatalogResponseInvalid {
                    reason: "expected value".to_string(),
                }))
            })
            .await;

        assert!(matches!(result, Err(IndexerError::CatalogResponseInvalid { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
