//! Retry policy with exponential backoff for navigation
//!
//! Only errors accepted by the policy's predicate are retried; by default that
//! is [`HarvestError::is_transient`], so authentication, rate-limit and
//! extraction failures go straight back to the caller.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use timeline_harvest::crawler::{RetryDecision, RetryPolicy};
//! use timeline_harvest::HarvestError;
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(10), 2.0);
//! let error = HarvestError::Network {
//!     url: "https://x.com/home".to_string(),
//!     message: "connection reset".to_string(),
//! };
//!
//! match policy.should_retry(&error, 1) {
//!     RetryDecision::Retry { delay, attempt } => assert_eq!((delay, attempt), (Duration::from_secs(1), 2)),
//!     RetryDecision::DoNotRetry { .. } => unreachable!(),
//! }
//! ```

use crate::config::RetryConfig;
use crate::HarvestError;
use std::time::Duration;

/// Decision on whether to retry a failed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the delay
    Retry {
        delay: Duration,
        /// Which attempt the retry will be (the first retry is attempt 2)
        attempt: u32,
    },

    DoNotRetry { reason: String },
}

/// Bounded exponential backoff
///
/// ```text
/// delay(n) = min(base_delay * multiplier^(n-1), max_delay)
/// ```
///
/// where `n` is the number of the attempt that just failed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
    retryable: fn(&HarvestError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier: backoff_multiplier.max(1.0),
            retryable: HarvestError::is_transient,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.backoff_multiplier,
        )
    }

    /// Replaces the retryable-error predicate
    pub fn with_predicate(mut self, retryable: fn(&HarvestError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Decides what to do after attempt number `attempt` failed with `error`
    pub fn should_retry(&self, error: &HarvestError, attempt: u32) -> RetryDecision {
        if !(self.retryable)(error) {
            return RetryDecision::DoNotRetry {
                reason: format!("not retryable: {}", error),
            };
        }

        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("gave up after {} attempts", attempt),
            };
        }

        let delay = self.delay_for(attempt);
        tracing::debug!(
            "Attempt {}/{} failed, retrying in {:?}",
            attempt,
            self.max_attempts,
            delay
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}
