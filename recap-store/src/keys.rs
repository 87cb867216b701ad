//! Deterministic key construction for the shared-store namespaces.
//!
//! The key shapes are a stable contract other tooling may depend on:
//!
//! | Purpose | Key shape | TTL |
//! |---|---|---|
//! | Cached result | `summary:{owner}:{repo}:{job}:{revision}` | 24h |
//! | Rate-limit counter | `rate:{owner}:{repo}` | 1h |
//! | Audit entry | `audit:{timestamp_ms}:{uuid-suffix}` | 7d |

use uuid::Uuid;

/// Namespace prefix for cached summaries.
pub const SUMMARY_PREFIX: &str = "summary:";
/// Namespace prefix for rate-limit counters.
pub const RATE_PREFIX: &str = "rate:";
/// Namespace prefix for audit entries.
pub const AUDIT_PREFIX: &str = "audit:";

/// Identity of one cached summary.
///
/// A new content revision produces a new key, never an overwrite, so
/// cached results are immutable by construction and need no in-place
/// invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    owner: String,
    repo: String,
    job_id: u64,
    content_revision: String,
}

impl SummaryKey {
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
        }
    }

    /// Serialize to the store key, fields in stable order.
    pub fn encode(&self) -> String {
        format!(
            "{}{}:{}:{}:{}",
            SUMMARY_PREFIX, self.owner, self.repo, self.job_id, self.content_revision
        )
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn content_revision(&self) -> &str {
        &self.content_revision
    }
}

/// Key of the fixed-window counter for one repository.
pub fn rate_key(owner: &str, repo: &str) -> String {
    format!("{}{}:{}", RATE_PREFIX, owner, repo)
}

/// Key of one audit entry: time-indexed with a random suffix so entries
/// written in the same millisecond never collide.
pub fn audit_key(timestamp_epoch_ms: i64, suffix: Uuid) -> String {
    format!("{}{}:{}", AUDIT_PREFIX, timestamp_epoch_ms, suffix)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_key_encoding() {
        let key = SummaryKey::new("acme", "widgets", 42, "abc123");
        assert_eq!(key.encode(), "summary:acme:widgets:42:abc123");
    }

    #[test]
    fn test_summary_key_new_revision_new_key() {
        let a = SummaryKey::new("acme", "widgets", 42, "abc123");
        let b = SummaryKey::new("acme", "widgets", 42, "def456");
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_rate_key_shape() {
        assert_eq!(rate_key("acme", "widgets"), "rate:acme:widgets");
    }

    #[test]
    fn test_audit_key_shape() {
        let suffix = Uuid::nil();
        let key = audit_key(1_700_000_000_000, suffix);
        assert!(key.starts_with("audit:1700000000000:"));
        assert!(key.ends_with(&suffix.to_string()));
    }

    #[test]
    fn test_prefixes_are_disjoint() {
        let summary = SummaryKey::new("acme", "widgets", 1, "r").encode();
        let rate = rate_key("acme", "widgets");
        let audit = audit_key(0, Uuid::nil());
        assert!(summary.starts_with(SUMMARY_PREFIX));
        assert!(rate.starts_with(RATE_PREFIX));
        assert!(audit.starts_with(AUDIT_PREFIX));
        assert!(!summary.starts_with(RATE_PREFIX));
        assert!(!rate.starts_with(SUMMARY_PREFIX));
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
