//! RECAP Core - Domain Types and Resilience Primitives
//!
//! This crate defines the data model shared by every Recap crate and the
//! two process-local resilience components: the bounded-backoff retry
//! executor and the circuit breaker guarding the classification path.
//!
//! Store-backed governance (rate limiting, result caching, audit logging)
//! lives in `recap-store`; provider boundaries live in `recap-llm` and
//! `recap-scm`.

pub mod breaker;
pub mod config;
pub mod content;
pub mod error;
pub mod retry;
pub mod types;

pub use breaker::{CircuitBreaker, CircuitState, Clock, SystemClock};
pub use config::{
    AuditConfig, BreakerConfig, CacheConfig, ContentThresholds, RateLimitConfig, RecapConfig,
    RetryConfig,
};
pub use content::has_meaningful_content;
pub use error::{
    ClassifyError, ConfigError, RecapError, RecapResult, Retriable, ScmError, StoreError,
};
pub use retry::{Idempotent, RetryExecutor};
pub use types::{
    AuditLogEntry, ChangeSummary, CommitInfo, JobOutcome, RateLimitStatus, SummaryJob,
    NEEDS_INPUT_SENTINEL,
};
