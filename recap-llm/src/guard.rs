//! Fail-closed guard around the classification call.
//!
//! Composes the circuit breaker with retry-wrapped provider calls in the
//! order the breaker contract requires: check `is_open` first, never touch
//! the provider (or the retry executor) while open, and report one outcome
//! per logical call afterward.
//!
//! This is the fail-closed counterpart of the fail-open store components:
//! when its dependency is unhealthy it rejects work instead of letting it
//! through.

use crate::ClassifierProvider;
use recap_core::{CircuitBreaker, ClassifyError, Idempotent, RetryExecutor};
use std::sync::Arc;

/// Breaker- and retry-guarded classifier.
pub struct ClassifierGuard {
    provider: Arc<dyn ClassifierProvider>,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
}

impl ClassifierGuard {
    pub fn new(
        provider: Arc<dyn ClassifierProvider>,
        breaker: CircuitBreaker,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            provider,
            breaker,
            retry,
        }
    }

    /// Run one guarded classification call.
    ///
    /// Returns [`ClassifyError::CircuitOpen`] without invoking the
    /// provider while the breaker is open. Otherwise runs the provider
    /// through the retry executor (the call is a pure read, hence safe to
    /// repeat) and records the overall outcome on the breaker.
    pub async fn classify(&self, prompt: &str) -> Result<String, ClassifyError> {
        if self.breaker.is_open() {
            tracing::info!(provider = self.provider.provider_id(), "circuit open, rejecting call");
            return Err(ClassifyError::CircuitOpen);
        }

        let result = self
            .retry
            .run(
                "classify",
                Idempotent::new(|| self.provider.classify(prompt)),
            )
            .await;

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(err) => {
                tracing::warn!(
                    provider = self.provider.provider_id(),
                    error = %err,
                    "classification call failed"
                );
                self.breaker.record_failure();
            }
        }

        result
    }

    /// Identifier of the wrapped provider.
    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }
}

impl std::fmt::Debug for ClassifierGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierGuard")
            .field("provider", &self.provider.provider_id())
            .field("breaker", &self.breaker)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockClassifier;
    use recap_core::{BreakerConfig, RetryConfig};
    use std::time::Duration;

    fn guard_with(
        threshold: u32,
        max_retries: u32,
    ) -> (ClassifierGuard, Arc<MockClassifier>) {
        let provider = Arc::new(MockClassifier::new());
        let guard = ClassifierGuard::new(
            provider.clone(),
            CircuitBreaker::new(BreakerConfig {
                failure_threshold: threshold,
                cool_down: Duration::from_secs(60),
            }),
            RetryExecutor::new(RetryConfig {
                max_retries,
                initial_delay: Duration::from_millis(1),
                max_jitter: Duration::ZERO,
            }),
        );
        (guard, provider)
    }

    fn fatal() -> ClassifyError {
        ClassifyError::UpstreamStatus {
            provider: "mock".to_string(),
            status: 400,
            message: "bad request".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let (guard, provider) = guard_with(5, 0);
        provider.push_summary("w", "y", "i");
        let text = guard.classify("prompt").await.unwrap();
        assert!(text.contains("\"what\""));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_circuit_opens_after_threshold_failures() {
        let (guard, provider) = guard_with(5, 0);
        for _ in 0..5 {
            provider.push_response(Err(fatal()));
            assert!(guard.classify("prompt").await.is_err());
        }
        assert_eq!(provider.calls(), 5);

        // Sixth call rejected without invoking the provider.
        let err = guard.classify("prompt").await.unwrap_err();
        assert_eq!(err, ClassifyError::CircuitOpen);
        assert_eq!(provider.calls(), 5);
    }

    #[tokio::test]
    async fn test_success_resets_failure_budget() {
        let (guard, provider) = guard_with(3, 0);
        for _ in 0..2 {
            provider.push_response(Err(fatal()));
            let _ = guard.classify("prompt").await;
        }
        provider.push_summary("w", "y", "i");
        guard.classify("prompt").await.unwrap();

        for _ in 0..2 {
            provider.push_response(Err(fatal()));
            let _ = guard.classify("prompt").await;
        }
        // Still closed: the success cleared the first two failures.
        provider.push_summary("w", "y", "i");
        assert!(guard.classify("prompt").await.is_ok());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_counts_as_one_breaker_failure() {
        let (guard, provider) = guard_with(2, 2);
        for _ in 0..3 {
            provider.push_response(Err(ClassifyError::Timeout {
                provider: "mock".to_string(),
            }));
        }
        let err = guard.classify("prompt").await.unwrap_err();
        assert!(matches!(err, ClassifyError::Timeout { .. }));
        // One logical call, three attempts, one recorded failure: the
        // breaker (threshold 2) must still be closed.
        assert_eq!(provider.calls(), 3);
        provider.push_summary("w", "y", "i");
        assert!(guard.classify("prompt").await.is_ok());
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_within_one_call() {
        let (guard, provider) = guard_with(5, 2);
        provider.push_response(Err(ClassifyError::Timeout {
            provider: "mock".to_string(),
        }));
        provider.push_summary("w", "y", "i");

        assert!(guard.classify("prompt").await.is_ok());
        assert_eq!(provider.calls(), 2);
    }
}
