//! Bounded exponential backoff for outbound calls
//!
//! The GitHub client, the callback notifier and the code generator all go
//! through [`with_retry`]. The default policy makes a single attempt;
//! retries are opt-in through the `[retry]` config section.

use rand::Rng;
use serde::Deserialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Jitter spreads each delay over `[1 - JITTER_SPREAD, 1 + JITTER_SPREAD]`
const JITTER_SPREAD: f64 = 0.2;

/// `[retry]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    pub initial_delay_ms: u64,

    /// Growth factor applied per attempt
    pub backoff_multiplier: f64,

    /// Upper bound on any single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Randomize delays so concurrent runs do not retry in lockstep
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Backoff before retry number `attempt + 1`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let ceiling = self.max_delay_ms as f64;
        let mut millis =
            (self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent)).min(ceiling);

        if self.jitter {
            millis *= rand::thread_rng().gen_range(1.0 - JITTER_SPREAD..=1.0 + JITTER_SPREAD);
        }
        Duration::from_millis(millis as u64)
    }

    fn delay_after(&self, attempt: u32, class: RetryClassification) -> Duration {
        match class {
            RetryClassification::RateLimited {
                retry_after_ms: Some(ms),
            } => Duration::from_millis(ms.min(self.max_delay_ms)),
            _ => self.delay_for_attempt(attempt),
        }
    }
}

/// How a failure should be treated by [`with_retry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClassification {
    /// Transient; try again after backoff
    Retry,

    /// Permanent; give up immediately
    NoRetry,

    /// Throttled; honor the server's hint when it sent one
    RateLimited { retry_after_ms: Option<u64> },
}

impl RetryClassification {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RetryClassification::NoRetry)
    }
}

/// Errors that know whether they are worth retrying
pub trait RetryableError {
    fn classify(&self) -> RetryClassification;
}

/// Run `operation` until it succeeds, fails permanently, or runs out of retries
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let class = err.classify();
        if !class.is_retryable() {
            debug!("{}: giving up on permanent error: {}", operation_name, err);
            return Err(err);
        }
        if attempt >= config.max_retries {
            if config.max_retries > 0 {
                warn!(
                    "{}: still failing after {} retries: {}",
                    operation_name, config.max_retries, err
                );
            }
            return Err(err);
        }

        let delay = config.delay_after(attempt, class);
        attempt += 1;
        warn!(
            "{}: attempt {} failed, retrying in {:?}: {}",
            operation_name, attempt, delay, err
        );
        tokio::time::sleep(delay).await;
    }
}
