//! Exponential backoff retry with jitter and cooperative cancellation.
//!
//! `with_retry` is the single entry point every source adapter's `fetch`
//! wraps its `do_fetch` call in. It does not know what "retryable" means
//! for a given error type — that classification comes from the caller,
//! typically `SourceError::is_retryable`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("all retry attempts exhausted after {attempts} tries: {source}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    #[error("operation failed with non-retryable error: {source}")]
    NonRetryable {
        #[source]
        source: E,
    },

    #[error("invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("retry cancelled")]
    Cancelled,
}

pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Backoff configuration. `delay(attempt) = clamp(base * multiplier^attempt,
/// 0, max_delay) * uniform[0.8, 1.2)`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts allowed is `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.multiplier <= 0.0 {
            return Err("multiplier must be greater than 0".into());
        }
        Ok(())
    }

    /// `delay(attempt) = clamp(base * multiplier^attempt, 0, max_delay) *
    /// uniform[0.8, 1.2)`. `attempt` is zero-based (the delay before the
    /// second attempt is `delay(0)`).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let raw_ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let clamped_ms = raw_ms.min(self.max_delay.as_millis() as f64).max(0.0);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((clamped_ms * jitter) as u64)
    }
}

#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn base_delay(mut self, d: Duration) -> Self {
        self.config.base_delay = d;
        self
    }

    pub fn max_delay(mut self, d: Duration) -> Self {
        self.config.max_delay = d;
        self
    }

    pub fn multiplier(mut self, m: f64) -> Self {
        self.config.multiplier = m;
        self
    }

    pub fn build(self) -> Result<RetryConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Attempt `op` up to `cfg.max_retries + 1` times.
///
/// Stops immediately (without sleeping) when `is_retryable` returns `false`
/// for the latest error, or when `cancel` is signalled — including during a
/// backoff sleep. On exhaustion or non-retryable failure the last error is
/// returned with its retryable flag already known to the caller; this
/// function does not itself mutate the error, the caller's classification
/// already answered `false` for the case that stopped the loop.
#[instrument(skip(op, is_retryable, cancel), fields(max_retries = cfg.max_retries))]
pub async fn with_retry<F, Fut, T, E>(
    cancel: &CancellationToken,
    cfg: &RetryConfig,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = is_retryable(&err);
                attempt += 1;
                if !retryable {
                    debug!(attempt, "non-retryable error, aborting");
                    return Err(RetryError::NonRetryable { source: err });
                }
                if attempt > cfg.max_retries {
                    warn!(attempt, "retry attempts exhausted");
                    return Err(RetryError::AttemptsExhausted { attempts: attempt, source: err });
                }
                let delay = cfg.delay_for_attempt(attempt - 1);
                debug!(attempt, ?delay, "retrying after delay");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                }
            }
        }
    }
}
