//! Circuit breaker for the classification call path.
//!
//! Process-local by design: each instance protects its own failure budget
//! and resets on restart. State is never stored in the shared store, so a
//! horizontally scaled deployment trips and recovers per process.
//!
//! Unlike the rate limiter and the result cache, the breaker fails
//! closed: while open it rejects calls instead of permitting them.

use crate::config::BreakerConfig;
use std::sync::{Arc, Mutex, MutexGuard};

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected without being attempted.
    Open,
    /// Cool-down elapsed; the next call is a trial.
    HalfOpen,
}

/// Time source seam so the open/half-open transition is testable.
pub trait Clock: Send + Sync {
    fn now_epoch_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug)]
struct BreakerInner {
    consecutive_failures: u32,
    open_until_epoch_ms: i64,
}

/// Failure-count circuit breaker guarding exactly one logical dependency.
///
/// Callers must check [`is_open`](Self::is_open) before invoking the
/// retry-wrapped operation and report the outcome afterward via
/// [`record_success`](Self::record_success) /
/// [`record_failure`](Self::record_failure). While open, the underlying
/// operation must not be invoked at all.
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Construct with an injected time source.
    pub fn with_clock(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                consecutive_failures: 0,
                open_until_epoch_ms: 0,
            }),
            clock,
        }
    }

    /// Whether calls must be rejected right now.
    ///
    /// When the cool-down has elapsed this performs the Half-Open
    /// transition itself: the failure counter resets and the next caller
    /// is allowed through as the trial call.
    pub fn is_open(&self) -> bool {
        let mut inner = self.lock();
        if inner.consecutive_failures < self.config.failure_threshold {
            return false;
        }

        let now = self.clock.now_epoch_ms();
        if now < inner.open_until_epoch_ms {
            return true;
        }

        tracing::info!("circuit cool-down elapsed, allowing trial call");
        inner.consecutive_failures = 0;
        inner.open_until_epoch_ms = 0;
        false
    }

    /// Report a successful call: the breaker closes fully.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.open_until_epoch_ms = 0;
    }

    /// Report a failed call. Reaching the threshold opens the breaker for
    /// the configured cool-down.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.config.failure_threshold {
            inner.open_until_epoch_ms =
                self.clock.now_epoch_ms() + self.config.cool_down.as_millis() as i64;
            tracing::warn!(
                consecutive_failures = inner.consecutive_failures,
                cool_down_ms = self.config.cool_down.as_millis() as u64,
                "circuit opened"
            );
        }
    }

    /// Current state, for observability only.
    pub fn state(&self) -> CircuitState {
        let inner = self.lock();
        if inner.consecutive_failures < self.config.failure_threshold {
            CircuitState::Closed
        } else if self.clock.now_epoch_ms() < inner.open_until_epoch_ms {
            CircuitState::Open
        } else {
            CircuitState::HalfOpen
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CircuitBreaker")
            .field("failure_threshold", &self.config.failure_threshold)
            .field("consecutive_failures", &inner.consecutive_failures)
            .field("open_until_epoch_ms", &inner.open_until_epoch_ms)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
