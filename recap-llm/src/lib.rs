//! RECAP LLM - Classifier Provider Boundary
//!
//! Provider-agnostic trait for the external classification call, the
//! prompt/response plumbing around it, and the fail-closed guard that
//! composes the circuit breaker with retry-wrapped provider calls.
//!
//! The provider contract is deliberately narrow: a prompt string in,
//! free-form text out. Everything structured about the exchange (the JSON
//! summary object, the needs-input sentinel) is handled by this crate's
//! parser so providers stay interchangeable.

pub mod anthropic;
pub mod guard;
pub mod parse;
pub mod prompt;

pub use anthropic::AnthropicClassifier;
pub use guard::ClassifierGuard;
pub use parse::parse_summary;
pub use prompt::build_prompt;

use async_trait::async_trait;
use recap_core::ClassifyError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

// ============================================================================
// CLASSIFIER PROVIDER TRAIT
// ============================================================================

/// Trait for classification providers.
/// Implementations must be thread-safe (Send + Sync).
///
/// The returned text is expected to contain a JSON object with `what`,
/// `why`, `impact` and optional `notes`; see [`parse_summary`]. Provider
/// implementations map their transport and status failures onto
/// [`ClassifyError`] so the retry executor can classify them.
#[async_trait]
pub trait ClassifierProvider: Send + Sync {
    /// Run one classification call.
    async fn classify(&self, prompt: &str) -> Result<String, ClassifyError>;

    /// Identifier used in logs and error messages (e.g. "anthropic").
    fn provider_id(&self) -> &str;
}

// ============================================================================
// MOCK PROVIDER FOR TESTING
// ============================================================================

/// Mock classifier with scripted responses and an invocation counter.
///
/// Responses are consumed in order; once the script is exhausted every
/// further call returns the fallback summary.
pub struct MockClassifier {
    responses: Mutex<VecDeque<Result<String, ClassifyError>>>,
    calls: AtomicU32,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue one scripted response.
    pub fn push_response(&self, response: Result<String, ClassifyError>) {
        match self.responses.lock() {
            Ok(mut responses) => responses.push_back(response),
            Err(poisoned) => poisoned.into_inner().push_back(response),
        }
    }

    /// Queue a well-formed summary response.
    pub fn push_summary(&self, what: &str, why: &str, impact: &str) {
        self.push_response(Ok(format!(
            r#"{{"what": "{}", "why": "{}", "impact": "{}"}}"#,
            what, why, impact
        )));
    }

    /// Number of classify invocations so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClassifierProvider for MockClassifier {
    async fn classify(&self, _prompt: &str) -> Result<String, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = match self.responses.lock() {
            Ok(mut responses) => responses.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        scripted.unwrap_or_else(|| {
            Ok(r#"{"what": "mock change", "why": "mock reason", "impact": "mock impact"}"#
                .to_string())
        })
    }

    fn provider_id(&self) -> &str {
        "mock"
    }
}

impl std::fmt::Debug for MockClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClassifier")
            .field("calls", &self.calls())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
