//! Provider retry — re-issues transient failures with exponential backoff.
//!
//! Wraps any provider. Only errors for which
//! [`ProviderError::is_retryable`] holds are retried; authentication and
//! malformed-response failures surface immediately.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use sunnyside_core::error::ProviderError;
use sunnyside_core::provider::*;
use tracing::{info, warn};

/// Backoff schedule for [`RetryProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(8000),
        }
    }
}

impl From<&sunnyside_config::RetryConfig> for RetryPolicy {
    fn from(config: &sunnyside_config::RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

/// A provider that retries its inner provider on transient failures.
pub struct RetryProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports_structured_output(&self) -> bool {
        self.inner.supports_structured_output()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut attempt = 0;

        loop {
            match self.inner.complete(request.clone()).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!(provider = %self.inner.name(), attempt, "Retry: request succeeded");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = match &e {
                        ProviderError::RateLimited { retry_after_secs } => self
                            .policy
                            .backoff_for(attempt)
                            .max(Duration::from_secs(*retry_after_secs))
                            .min(self.policy.max_backoff),
                        _ => self.policy.backoff_for(attempt),
                    };
                    warn!(
                        provider = %self.inner.name(),
                        error = %e,
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retry: transient provider failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
