//! Configuration types
//!
//! Every knob is loaded from `RECAP_*` environment variables with defaults
//! matching the reference deployment, then validated as a whole.

use crate::error::{ConfigError, RecapResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration for outbound calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt; `max_retries + 1` total attempts.
    pub max_retries: u32,
    /// Base delay, doubled per attempt.
    pub initial_delay: Duration,
    /// Upper bound of the additive random jitter.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

/// Circuit breaker configuration for the classification path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open once tripped.
    pub cool_down: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(60),
        }
    }
}

/// Fixed-window rate limit configuration, applied per repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Permitted jobs per window.
    pub limit: i64,
    /// Window length; the counter expires this long after its first
    /// increment.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            window: Duration::from_secs(3600),
        }
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for every cached summary.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Compliance retention window for audit records.
    pub retention: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Heuristic thresholds deciding whether a change has enough content to
/// classify. Tunable constants, not protocol guarantees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentThresholds {
    /// Minimum diff length in characters.
    pub min_diff_len: usize,
    /// Minimum length of a commit message that counts as meaningful.
    pub min_commit_message_len: usize,
    /// Minimum length of a description that counts as meaningful.
    pub min_description_len: usize,
    /// Diff ceiling; longer diffs are truncated before prompting.
    pub max_diff_len: usize,
}

impl Default for ContentThresholds {
    fn default() -> Self {
        Self {
            min_diff_len: 50,
            min_commit_message_len: 10,
            min_description_len: 20,
            max_diff_len: 60_000,
        }
    }
}

/// Master configuration for the governance layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecapConfig {
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub audit: AuditConfig,
    pub content: ContentThresholds,
}

impl RecapConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RECAP_MAX_RETRIES`: retries after the first attempt (default: 3)
    /// - `RECAP_RETRY_INITIAL_DELAY_MS`: base backoff delay (default: 500)
    /// - `RECAP_RETRY_MAX_JITTER_MS`: additive jitter bound (default: 1000)
    /// - `RECAP_BREAKER_THRESHOLD`: consecutive failures to trip (default: 5)
    /// - `RECAP_BREAKER_COOL_DOWN_MS`: open duration (default: 60000)
    /// - `RECAP_RATE_LIMIT`: jobs per repository per window (default: 10)
    /// - `RECAP_RATE_WINDOW_SECS`: window length (default: 3600)
    /// - `RECAP_CACHE_TTL_SECS`: summary TTL (default: 86400)
    /// - `RECAP_AUDIT_RETENTION_SECS`: audit retention (default: 604800)
    /// - `RECAP_MIN_DIFF_LEN`, `RECAP_MIN_COMMIT_MSG_LEN`,
    ///   `RECAP_MIN_DESCRIPTION_LEN`, `RECAP_MAX_DIFF_LEN`: content
    ///   thresholds (defaults: 50 / 10 / 20 / 60000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            retry: RetryConfig {
                max_retries: env_parse("RECAP_MAX_RETRIES", defaults.retry.max_retries),
                initial_delay: Duration::from_millis(env_parse(
                    "RECAP_RETRY_INITIAL_DELAY_MS",
                    defaults.retry.initial_delay.as_millis() as u64,
                )),
                max_jitter: Duration::from_millis(env_parse(
                    "RECAP_RETRY_MAX_JITTER_MS",
                    defaults.retry.max_jitter.as_millis() as u64,
                )),
            },
            breaker: BreakerConfig {
                failure_threshold: env_parse(
                    "RECAP_BREAKER_THRESHOLD",
                    defaults.breaker.failure_threshold,
                ),
                cool_down: Duration::from_millis(env_parse(
                    "RECAP_BREAKER_COOL_DOWN_MS",
                    defaults.breaker.cool_down.as_millis() as u64,
                )),
            },
            rate_limit: RateLimitConfig {
                limit: env_parse("RECAP_RATE_LIMIT", defaults.rate_limit.limit),
                window: Duration::from_secs(env_parse(
                    "RECAP_RATE_WINDOW_SECS",
                    defaults.rate_limit.window.as_secs(),
                )),
            },
            cache: CacheConfig {
                ttl: Duration::from_secs(env_parse(
                    "RECAP_CACHE_TTL_SECS",
                    defaults.cache.ttl.as_secs(),
                )),
            },
            audit: AuditConfig {
                retention: Duration::from_secs(env_parse(
                    "RECAP_AUDIT_RETENTION_SECS",
                    defaults.audit.retention.as_secs(),
                )),
            },
            content: ContentThresholds {
                min_diff_len: env_parse("RECAP_MIN_DIFF_LEN", defaults.content.min_diff_len),
                min_commit_message_len: env_parse(
                    "RECAP_MIN_COMMIT_MSG_LEN",
                    defaults.content.min_commit_message_len,
                ),
                min_description_len: env_parse(
                    "RECAP_MIN_DESCRIPTION_LEN",
                    defaults.content.min_description_len,
                ),
                max_diff_len: env_parse("RECAP_MAX_DIFF_LEN", defaults.content.max_diff_len),
            },
        }
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(RecapError::Config) if invalid.
    pub fn validate(&self) -> RecapResult<()> {
        if self.retry.initial_delay.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "retry.initial_delay".to_string(),
                value: format!("{:?}", self.retry.initial_delay),
                reason: "initial_delay must be positive".to_string(),
            }
            .into());
        }

        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "breaker.failure_threshold".to_string(),
                value: self.breaker.failure_threshold.to_string(),
                reason: "failure_threshold must be greater than 0".to_string(),
            }
            .into());
        }

        if self.breaker.cool_down.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "breaker.cool_down".to_string(),
                value: format!("{:?}", self.breaker.cool_down),
                reason: "cool_down must be positive".to_string(),
            }
            .into());
        }

        if self.rate_limit.limit <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.limit".to_string(),
                value: self.rate_limit.limit.to_string(),
                reason: "limit must be greater than 0".to_string(),
            }
            .into());
        }

        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.window".to_string(),
                value: format!("{:?}", self.rate_limit.window),
                reason: "window must be positive".to_string(),
            }
            .into());
        }

        if self.cache.ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl".to_string(),
                value: format!("{:?}", self.cache.ttl),
                reason: "ttl must be positive".to_string(),
            }
            .into());
        }

        if self.audit.retention.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "audit.retention".to_string(),
                value: format!("{:?}", self.audit.retention),
                reason: "retention must be positive".to_string(),
            }
            .into());
        }

        if self.content.max_diff_len < self.content.min_diff_len {
            return Err(ConfigError::InvalidValue {
                field: "content.max_diff_len".to_string(),
                value: self.content.max_diff_len.to_string(),
                reason: "max_diff_len must be at least min_diff_len".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

// =============================================================================
// TESTS
// =============================================================================
