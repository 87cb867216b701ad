//! Distributed fixed-window rate limiter.
//!
//! One atomic counter per repository under `rate:{owner}:{repo}`. The
//! first increment of a window arms the expiry, so windows reset on their
//! own. Fixed-window semantics: bursts straddling a window boundary can
//! momentarily exceed the intended average rate, which is accepted.

use crate::backend::StoreBackend;
use crate::keys::rate_key;
use recap_core::{RateLimitConfig, RateLimitStatus, StoreError};
use std::sync::Arc;

/// Per-repository fixed-window limiter over the shared store.
///
/// The read path fails open: an unreachable store produces a permissive
/// status, never an error.
pub struct RateLimiter {
    store: Arc<dyn StoreBackend>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn StoreBackend>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Count this call against the repository's window and report the
    /// resulting status.
    ///
    /// The increment is atomic; the `remaining` in the returned status
    /// reflects the post-increment value observed by this call only. Two
    /// racing calls may both read a stale `remaining`, but the counter
    /// itself never loses an increment.
    pub async fn check_and_increment(&self, owner: &str, repo: &str) -> RateLimitStatus {
        let key = rate_key(owner, repo);
        let window_ms = self.config.window.as_millis() as i64;
        let reset_at = chrono::Utc::now().timestamp_millis() + window_ms;

        let count = match self.store.incr(&key).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "rate limiter failing open");
                return RateLimitStatus::fail_open(self.config.limit, reset_at);
            }
        };

        if count == 1 {
            if let Err(err) = self.store.expire(&key, self.config.window).await {
                // The counter survives without an expiry until the store
                // recovers; better an over-long window than a blocked one.
                tracing::warn!(key = %key, error = %err, "failed to arm rate window expiry");
            }
        }

        let status = RateLimitStatus::from_count(self.config.limit, count, reset_at);
        if status.limited {
            tracing::info!(
                key = %key,
                count,
                limit = self.config.limit,
                "rate limit exceeded"
            );
        }
        status
    }

    /// Administrative override: drop the counter so the window restarts.
    /// Idempotent on a non-existent key; unlike the read path this
    /// propagates store errors.
    pub async fn reset(&self, owner: &str, repo: &str) -> Result<(), StoreError> {
        self.store.delete(&rate_key(owner, repo)).await
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.config.limit)
            .field("window", &self.config.window)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
