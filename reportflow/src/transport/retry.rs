//! Retry policy with exponential backoff.
//!
//! Transient failures (429, 5xx, network errors) are retried after a delay
//! that starts at `initial_backoff_ms` and is multiplied after every retry.
//! There is no jitter: the delay sequence is deterministic.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Factor applied to the delay after each retry.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> u32 {
    2
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the defaults (3 retries, 1000 ms, x2).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial backoff.
    #[must_use]
    pub fn with_initial_backoff_ms(mut self, delay: u64) -> Self {
        self.initial_backoff_ms = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: u32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Total attempts including the first one.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-indexed).
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = u64::from(self.backoff_multiplier).saturating_pow(retry);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }

    /// Whether a response status is transient.
    #[must_use]
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || status >= 500
    }

    /// Decides what to do after a failed attempt.
    ///
    /// `retries_used` is the number of retries already performed.
    #[must_use]
    pub fn decide(&self, retries_used: u32, retryable: bool) -> RetryDecision {
        if !retryable {
            RetryDecision::NotRetryable
        } else if retries_used >= self.max_retries {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.delay_for_retry(retries_used))
        }
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more retries, give up.
    GiveUp,
    /// Don't retry, the error is not retryable.
    NotRetryable,
}
