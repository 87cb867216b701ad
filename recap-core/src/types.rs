//! Core value objects for summarization jobs and their governance.

use serde::{Deserialize, Serialize};

/// Sentinel the classifier places in all three required summary fields to
/// signal "insufficient input". A valid result value, never an error.
pub const NEEDS_INPUT_SENTINEL: &str = "[NEEDS_INPUT]";

// ============================================================================
// RATE LIMIT STATUS
// ============================================================================

/// Snapshot of a rate-limit window after an increment.
///
/// The authority is the atomic counter in the shared store; `remaining` is
/// computed from the post-increment value observed by this call only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// Maximum permitted calls per window.
    pub limit: i64,
    /// Calls left in the current window, never negative.
    pub remaining: i64,
    /// When the current window expires (epoch milliseconds).
    pub reset_at_epoch_ms: i64,
    /// Whether this call exceeded the window budget.
    pub limited: bool,
}

impl RateLimitStatus {
    /// Build a status from the post-increment counter value.
    ///
    /// The call numbered `limit` is still permitted; the call numbered
    /// `limit + 1` is the first limited one.
    pub fn from_count(limit: i64, count: i64, reset_at_epoch_ms: i64) -> Self {
        Self {
            limit,
            remaining: (limit - count).max(0),
            reset_at_epoch_ms,
            limited: count > limit,
        }
    }

    /// Permissive status used when the shared store is unreachable.
    /// Never blocks legitimate traffic due to infrastructure failure.
    pub fn fail_open(limit: i64, reset_at_epoch_ms: i64) -> Self {
        Self {
            limit,
            remaining: limit,
            reset_at_epoch_ms,
            limited: false,
        }
    }
}

// ============================================================================
// CHANGE SUMMARY
// ============================================================================

/// The classifier's structured verdict on a code change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// What the change does.
    pub what: String,
    /// Why the change was made.
    pub why: String,
    /// Expected impact of the change.
    pub impact: String,
    /// Optional reviewer notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ChangeSummary {
    /// True when the classifier flagged the input as insufficient by
    /// placing the sentinel in all three required fields.
    pub fn needs_input(&self) -> bool {
        self.what == NEEDS_INPUT_SENTINEL
            && self.why == NEEDS_INPUT_SENTINEL
            && self.impact == NEEDS_INPUT_SENTINEL
    }
}

// ============================================================================
// SUMMARY JOB
// ============================================================================

/// A single commit of the change under summarization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
}

/// Normalized descriptor of one summarization job.
///
/// `diff` and `commits` may arrive pre-populated from the invoking
/// collaborator; when absent the orchestrator fetches them through the
/// repository client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryJob {
    /// Repository owner (organization or user slug).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Change-request number within the repository.
    pub job_id: u64,
    /// Identifier that uniquely determines the classification input,
    /// e.g. the head commit SHA.
    pub content_revision: String,
    /// Unified diff text, when already fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Commits in the change, when already fetched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<CommitInfo>,
    /// Author-supplied description of the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Labels attached to the change request, for the skip filter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl SummaryJob {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        job_id: u64,
        content_revision: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            job_id,
            content_revision: content_revision.into(),
            diff: None,
            commits: Vec::new(),
            description: None,
            labels: Vec::new(),
        }
    }

    /// Set the pre-fetched diff text.
    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.diff = Some(diff.into());
        self
    }

    /// Set the pre-fetched commit list.
    pub fn with_commits(mut self, commits: Vec<CommitInfo>) -> Self {
        self.commits = commits;
        self
    }

    /// Set the author description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the change-request labels.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }
}

// ============================================================================
// JOB OUTCOME
// ============================================================================

/// Terminal result of processing one job.
///
/// Everything here is a valid outcome, not an error; fatal failures
/// propagate as `RecapError` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// A fresh summary was produced and cached.
    Completed { summary: ChangeSummary },
    /// A previously computed summary was served for this content revision.
    CacheHit { summary: ChangeSummary },
    /// A skip label excluded the job before any governed work.
    IgnoredByLabel,
    /// The per-repository window budget was exhausted.
    RateLimited { status: RateLimitStatus },
    /// Input was below the content thresholds, or the classifier returned
    /// the needs-input sentinel.
    InsufficientContent,
    /// The breaker rejected the classification call without attempting it.
    CircuitOpen,
}

impl JobOutcome {
    /// Stable string identifier, used in audit records and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Completed { .. } => "completed",
            JobOutcome::CacheHit { .. } => "cache_hit",
            JobOutcome::IgnoredByLabel => "ignored_by_label",
            JobOutcome::RateLimited { .. } => "rate_limited",
            JobOutcome::InsufficientContent => "insufficient_content",
            JobOutcome::CircuitOpen => "circuit_open",
        }
    }
}

// ============================================================================
// AUDIT LOG ENTRY
// ============================================================================

/// Append-only record of one consequential action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// When the action happened (epoch milliseconds).
    pub timestamp_epoch_ms: i64,
    /// Identifier tying the record to its job, e.g. the content revision.
    pub correlation_id: String,
    /// Who acted (service or administrative principal).
    pub actor: String,
    /// What happened, e.g. `summary_generated`.
    pub action: String,
    /// The resource acted on, e.g. `acme/widgets#42`.
    pub resource: String,
    /// Free-form structured context.
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl AuditLogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_epoch_ms: chrono::Utc::now().timestamp_millis(),
            correlation_id: correlation_id.into(),
            actor: actor.into(),
            action: action.into(),
            resource: resource.into(),
            details: serde_json::Map::new(),
        }
    }

    /// Attach one detail field.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_status_under_limit() {
        let status = RateLimitStatus::from_count(10, 3, 1_000);
        assert_eq!(status.remaining, 7);
        assert!(!status.limited);
    }

    #[test]
    fn test_rate_limit_status_at_limit_still_permitted() {
        let status = RateLimitStatus::from_count(10, 10, 1_000);
        assert_eq!(status.remaining, 0);
        assert!(!status.limited);
    }

    #[test]
    fn test_rate_limit_status_over_limit() {
        let status = RateLimitStatus::from_count(10, 11, 1_000);
        assert_eq!(status.remaining, 0);
        assert!(status.limited);
    }

    #[test]
    fn test_rate_limit_status_fail_open() {
        let status = RateLimitStatus::fail_open(25, 99);
        assert!(!status.limited);
        assert_eq!(status.remaining, 25);
        assert_eq!(status.limit, 25);
    }

    #[test]
    fn test_change_summary_needs_input() {
        let summary = ChangeSummary {
            what: NEEDS_INPUT_SENTINEL.to_string(),
            why: NEEDS_INPUT_SENTINEL.to_string(),
            impact: NEEDS_INPUT_SENTINEL.to_string(),
            notes: None,
        };
        assert!(summary.needs_input());
    }

    #[test]
    fn test_change_summary_partial_sentinel_is_not_needs_input() {
        let summary = ChangeSummary {
            what: NEEDS_INPUT_SENTINEL.to_string(),
            why: "refactor".to_string(),
            impact: NEEDS_INPUT_SENTINEL.to_string(),
            notes: None,
        };
        assert!(!summary.needs_input());
    }

    #[test]
    fn test_change_summary_serde_roundtrip() {
        let summary = ChangeSummary {
            what: "Adds retry".to_string(),
            why: "Flaky upstream".to_string(),
            impact: "Fewer failures".to_string(),
            notes: Some("check backoff".to_string()),
        };
        let json = serde_json::to_string(&summary).expect("serialize");
        let back: ChangeSummary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(summary, back);
    }

    #[test]
    fn test_summary_job_builders() {
        let job = SummaryJob::new("acme", "widgets", 42, "abc123")
            .with_diff("+ fn main() {}")
            .with_description("adds entry point")
            .with_labels(vec!["feature".to_string()]);
        assert_eq!(job.owner, "acme");
        assert_eq!(job.job_id, 42);
        assert_eq!(job.diff.as_deref(), Some("+ fn main() {}"));
        assert_eq!(job.labels, vec!["feature".to_string()]);
    }

    #[test]
    fn test_job_outcome_as_str() {
        assert_eq!(JobOutcome::IgnoredByLabel.as_str(), "ignored_by_label");
        assert_eq!(JobOutcome::InsufficientContent.as_str(), "insufficient_content");
        assert_eq!(JobOutcome::CircuitOpen.as_str(), "circuit_open");
        let status = RateLimitStatus::fail_open(1, 0);
        assert_eq!(JobOutcome::RateLimited { status }.as_str(), "rate_limited");
    }

    #[test]
    fn test_audit_entry_with_detail() {
        let entry = AuditLogEntry::new("abc123", "recap", "cache_hit", "acme/widgets#42")
            .with_detail("revision", "abc123");
        assert_eq!(entry.action, "cache_hit");
        assert_eq!(
            entry.details.get("revision"),
            Some(&serde_json::Value::String("abc123".to_string()))
        );
        assert!(entry.timestamp_epoch_ms > 0);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
