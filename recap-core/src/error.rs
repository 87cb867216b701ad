//! Error types for Recap operations

use thiserror::Error;

/// Shared-store errors.
///
/// These never abort the event path on their own: the rate limiter and the
/// result cache translate them into fail-open statuses and misses, and the
/// audit log swallows them on append. Only administrative operations
/// (limiter reset, audit range queries) propagate them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Store operation {op} failed on {key}: {reason}")]
    OperationFailed {
        op: String,
        key: String,
        reason: String,
    },

    #[error("Malformed value at {key}: {reason}")]
    MalformedValue { key: String, reason: String },
}

/// Classification (LLM) call errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Request to {provider} failed with status {status}: {message}")]
    UpstreamStatus {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Request to {provider} timed out")]
    Timeout { provider: String },

    #[error("Connection to {provider} failed: {reason}")]
    Connection { provider: String, reason: String },

    #[error("Malformed response from {provider}: {reason}")]
    MalformedResponse { provider: String, reason: String },

    #[error("Invalid API key for {provider}")]
    InvalidApiKey { provider: String },

    /// The breaker rejected the call without attempting it. Distinct from
    /// every call-failure variant so callers can apply different
    /// backoff/user-messaging logic.
    #[error("Classifier circuit is open, call not attempted")]
    CircuitOpen,
}

/// Source-repository API errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScmError {
    #[error("Rate limited by {host}")]
    RateLimited { host: String },

    #[error("Request to {host} failed with status {status}: {message}")]
    UpstreamStatus {
        host: String,
        status: u16,
        message: String,
    },

    #[error("Request to {host} timed out")]
    Timeout { host: String },

    #[error("Connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Recap errors.
#[derive(Debug, Clone, Error)]
pub enum RecapError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),

    #[error("SCM error: {0}")]
    Scm(#[from] ScmError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Recap operations.
pub type RecapResult<T> = Result<T, RecapError>;

/// Classification seam used by the retry executor.
///
/// Retriable errors are the transient upstream classes: HTTP 429, HTTP
/// >= 500, timeouts, and connection-level failures (resets, DNS). Anything
/// else is fatal and propagates after the first attempt.
pub trait Retriable {
    fn is_retriable(&self) -> bool;
}

impl Retriable for ClassifyError {
    fn is_retriable(&self) -> bool {
        match self {
            ClassifyError::RateLimited { .. }
            | ClassifyError::Timeout { .. }
            | ClassifyError::Connection { .. } => true,
            ClassifyError::UpstreamStatus { status, .. } => *status >= 500,
            ClassifyError::MalformedResponse { .. }
            | ClassifyError::InvalidApiKey { .. }
            | ClassifyError::CircuitOpen => false,
        }
    }
}

impl Retriable for ScmError {
    fn is_retriable(&self) -> bool {
        match self {
            ScmError::RateLimited { .. }
            | ScmError::Timeout { .. }
            | ScmError::Connection { .. } => true,
            ScmError::UpstreamStatus { status, .. } => *status >= 500,
            ScmError::NotFound { .. } => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
