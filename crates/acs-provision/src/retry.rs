//! Retry policy for downstream calls
//!
//! Transient failures (429, 5xx, connection errors) are retried up to
//! `max_attempts` with a fixed or exponential delay. Every other failure
//! propagates on the first attempt.

use crate::error::ServiceError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay every time
    Fixed,
    /// Delay multiplied after each attempt, capped at `max_delay`
    Exponential {
        /// Growth factor
        multiplier: f64,
        /// Upper bound
        max_delay: Duration,
    },
}

/// Bounded retry with delay
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub delay: Duration,
    /// Delay growth
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Self::DEFAULT_ATTEMPTS, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    /// Attempts for most downstream calls
    pub const DEFAULT_ATTEMPTS: u32 = 3;

    /// Attempts for KPI submission
    pub const KPI_SUBMISSION_ATTEMPTS: u32 = 10;

    /// Fixed delay policy
    #[inline]
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Exponential delay policy
    #[inline]
    #[must_use]
    pub fn exponential(
        max_attempts: u32,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: initial_delay,
            backoff: Backoff::Exponential {
                multiplier,
                max_delay,
            },
        }
    }

    /// No delay between attempts
    #[inline]
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }

    /// With a different attempt bound
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay after failed attempt `attempt` (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let factor = multiplier.max(1.0).powi(exponent);
                let millis = self.delay.as_secs_f64() * 1000.0 * factor;
                if !millis.is_finite() || millis >= max_delay.as_secs_f64() * 1000.0 {
                    max_delay
                } else {
                    Duration::from_secs_f64(millis / 1000.0)
                }
            }
        }
    }

    /// Run `call` until it succeeds, fails permanently or attempts run out
    ///
    /// # Errors
    /// The first non-retryable error, or the last transient one
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ServiceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt = 1;
        loop {
            match call(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient failure, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) if err.is_not_found() => {
                    debug!(operation, attempt, "downstream entity not found");
                    return Err(err);
                }
                Err(err) => {
                    error!(
                        operation,
                        attempt,
                        kind = %err.kind(),
                        error = %err,
                        "downstream call failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Like [`run`](Self::run), with an existence probe before every attempt
    ///
    /// A failing probe counts as a failed attempt.
    ///
    /// # Errors
    /// The first non-retryable error, or the last transient one
    pub async fn run_with_probe<T, P, PFut, F, Fut>(
        &self,
        operation: &str,
        mut probe: P,
        mut call: F,
    ) -> Result<T, ServiceError>
    where
        P: FnMut() -> PFut,
        PFut: Future<Output = Result<(), ServiceError>>,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        self.run(operation, |attempt| {
            let probed = probe();
            let called = call(attempt);
            async move {
                probed.await?;
                called.await
            }
        })
        .await
    }
}
