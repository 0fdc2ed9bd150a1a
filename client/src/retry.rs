//! Transport-level retry for JSON-RPC requests.
//!
//! Only the RPC transport retries, and only on transient network failures.
//! Builders, the metadata fetcher and the proposal parser never retry.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result, RetryContext};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry strategy configuration
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Maximum number of retries after the first attempt
    pub max_retries: usize,
    /// Initial retry delay
    pub initial_delay: Duration,
    /// Maximum retry delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl RetryStrategy {
    /// Create a new retry strategy from client config
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            multiplier: config.retry_multiplier,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.multiplier)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Whether `error` is a transient transport failure
    pub fn is_retryable(error: &ClientError) -> bool {
        match error {
            ClientError::Network(err) => err.is_timeout() || err.is_connect(),
            // proxies answer overload and rate limits with non JSON-RPC bodies
            ClientError::Transport(_) => true,
            _ => false,
        }
    }

    fn classify(&self, error: ClientError, attempt: usize) -> backoff::Error<ClientError> {
        if !Self::is_retryable(&error) || self.max_retries == 0 {
            return backoff::Error::permanent(error);
        }
        if attempt > self.max_retries {
            warn!("Giving up after {} attempts: {}", attempt, error);
            return backoff::Error::permanent(ClientError::MaxRetriesExceeded(self.max_retries));
        }
        backoff::Error::transient(error)
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of retries
    pub async fn retry<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = AtomicUsize::new(0);
        let mut context = RetryContext::new();

        let (attempts_ref, operation_ref) = (&attempts, &operation);
        let outcome = backoff::future::retry_notify(
            self.backoff(),
            move || async move {
                let attempt = attempts_ref.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Attempt {} of {}", attempt, self.max_retries + 1);
                operation_ref()
                    .await
                    .map_err(|error| self.classify(error, attempt))
            },
            |error: ClientError, delay: Duration| {
                context.record_attempt(&error.to_string(), delay.as_millis() as u64);
                warn!("Transient failure: {}. Retrying in {:?}", error, delay);
            },
        )
        .await;

        if outcome.is_ok() && context.attempts > 0 {
            debug!(
                "Recovered after {} retries ({}ms backoff)",
                context.attempts, context.total_time_ms
            );
        }
        outcome
    }
}
