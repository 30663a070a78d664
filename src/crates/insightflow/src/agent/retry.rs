//! Retry logic for model calls
//!
//! Exponential backoff with jitter around a single model call. Errors are
//! classified from the provider error so authentication problems and bad
//! requests fail fast while rate limits and outages are retried.

use llm::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Classification of errors for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed on retry (rate limits, timeouts, 5xx)
    Transient,

    /// Will not succeed on retry (bad credentials, invalid request)
    Permanent,

    /// Anything else; retried like a transient error
    Unknown,
}

/// Retry strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Whether to add up to 25% random jitter to backoff delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// No retries at all.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn with_initial_backoff(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    pub fn with_max_backoff(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate backoff delay for a given attempt
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powi(attempt as i32)) as u64;

        let delay_ms = delay_ms.min(self.max_backoff_ms);

        let delay_ms = if self.jitter {
            let jitter_amount = (delay_ms as f64 * 0.25 * rand::random::<f64>()) as u64;
            delay_ms + jitter_amount
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms)
    }
}

/// Classify a provider error to decide whether to retry it
pub fn classify_error(error: &LlmError) -> ErrorClass {
    if error.is_permanent() {
        ErrorClass::Permanent
    } else if error.is_retryable() {
        ErrorClass::Transient
    } else {
        ErrorClass::Unknown
    }
}

/// Execute a model call with retry logic
///
/// Returns the first success, the first permanent error, or the last error
/// once `max_retries` retries are exhausted.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            info!(
                operation = operation_name,
                attempt = attempt,
                max_retries = config.max_retries,
                "Retrying operation"
            );
        }

        let e = match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        let error_class = classify_error(&e);

        debug!(
            operation = operation_name,
            attempt = attempt,
            error = %e,
            classification = ?error_class,
            "Operation failed"
        );

        if error_class == ErrorClass::Permanent {
            error!(
                operation = operation_name,
                error = %e,
                "Permanent error detected, aborting retries"
            );
            return Err(e);
        }

        if attempt >= config.max_retries {
            error!(
                operation = operation_name,
                max_retries = config.max_retries,
                error = %e,
                "All retry attempts exhausted"
            );
            return Err(e);
        }

        let delay = config.backoff_delay(attempt);
        warn!(
            operation = operation_name,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            "Transient error, will retry after delay"
        );
        tokio::time::sleep(delay).await;

        attempt += 1;
    }
}
