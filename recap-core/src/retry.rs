//! Bounded exponential-backoff retry execution.
//!
//! Every outbound call (repository API, classifier) runs through
//! [`RetryExecutor::run`]. Errors are split into retriable and fatal via
//! the [`Retriable`] trait; fatal errors and exhausted budgets propagate
//! the most recent error unchanged.
//!
//! Only operations that are safe to repeat may be wrapped. That contract
//! is carried by the [`Idempotent`] marker: constructing it is the call
//! site's assertion, so a non-idempotent operation has to be visibly
//! mislabeled before it can reach the executor.

use crate::config::RetryConfig;
use crate::error::Retriable;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Marker wrapper asserting that an operation is idempotent, or safely
/// repeatable, from the caller's perspective.
pub struct Idempotent<F>(F);

impl<F> Idempotent<F> {
    /// Wrap an operation the call site vouches is safe to repeat.
    pub fn new(op: F) -> Self {
        Self(op)
    }
}

/// Runs operations with bounded exponential backoff and additive jitter.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Attempt `op` up to `max_retries + 1` times.
    ///
    /// A fatal-classified error propagates immediately; a retriable one
    /// sleeps `initial_delay * 2^attempt + jitter` and tries again while
    /// budget remains. Attempts and retry decisions are logged but never
    /// alter control flow.
    pub async fn run<F, Fut, T, E>(&self, label: &str, op: Idempotent<F>) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retriable + fmt::Display,
    {
        let Idempotent(mut op) = op;
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(op = label, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if !err.is_retriable() {
                        tracing::debug!(op = label, attempt, error = %err, "fatal error, not retrying");
                        return Err(err);
                    }
                    if attempt >= self.config.max_retries {
                        tracing::warn!(op = label, attempt, error = %err, "retry budget exhausted");
                        return Err(err);
                    }

                    let delay = self.delay_for_attempt(attempt);
                    tracing::debug!(
                        op = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// `initial_delay * 2^attempt` plus uniform jitter in
    /// `[0, max_jitter]`. The exponent is clamped so pathological retry
    /// budgets cannot overflow the multiplier.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        let base = self.config.initial_delay.saturating_mul(factor);

        let max_jitter_ms = self.config.max_jitter.as_millis() as u64;
        let jitter_ms = if max_jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=max_jitter_ms)
        };

        base + Duration::from_millis(jitter_ms)
    }
}

// =============================================================================
// TESTS
// =============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: without jitter the backoff sequence is non-decreasing
        /// and each step is exactly double the last (until the clamp).
        #[test]
        fn prop_backoff_doubles(initial_ms in 1u64..5_000, attempt in 0u32..15) {
            let executor = RetryExecutor::new(RetryConfig {
                max_retries: 10,
                initial_delay: Duration::from_millis(initial_ms),
                max_jitter: Duration::ZERO,
            });
            let this = executor.delay_for_attempt(attempt);
            let next = executor.delay_for_attempt(attempt + 1);
            prop_assert_eq!(next, this * 2);
        }

        /// Property: jitter never pushes a delay below the deterministic
        /// base or above base + max_jitter.
        #[test]
        fn prop_jitter_bounded(initial_ms in 1u64..1_000, jitter_ms in 1u64..2_000, attempt in 0u32..8) {
            let executor = RetryExecutor::new(RetryConfig {
                max_retries: 10,
                initial_delay: Duration::from_millis(initial_ms),
                max_jitter: Duration::from_millis(jitter_ms),
            });
            let base = Duration::from_millis(initial_ms) * (1 << attempt);
            let delay = executor.delay_for_attempt(attempt);
            prop_assert!(delay >= base);
            prop_assert!(delay <= base + Duration::from_millis(jitter_ms));
        }
    }
}
