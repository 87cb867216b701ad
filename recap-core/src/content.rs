//! Meaningful-content heuristics.
//!
//! A change request with a near-empty diff, throwaway commit messages, and
//! no description gives the classifier nothing to work with; filtering it
//! out here saves a round trip that would come back as needs-input anyway.
//! Thresholds are tunable constants in [`ContentThresholds`], not protocol
//! guarantees.

use crate::config::ContentThresholds;
use crate::types::CommitInfo;

/// Decide whether a job carries enough signal to classify.
///
/// True when the diff clears the minimum length, or any commit message
/// does, or the description does. Whitespace-only text never counts.
pub fn has_meaningful_content(
    diff: &str,
    commits: &[CommitInfo],
    description: Option<&str>,
    thresholds: &ContentThresholds,
) -> bool {
    if diff.trim().len() >= thresholds.min_diff_len {
        return true;
    }

    if commits
        .iter()
        .any(|c| c.message.trim().len() >= thresholds.min_commit_message_len)
    {
        return true;
    }

    description
        .map(|d| d.trim().len() >= thresholds.min_description_len)
        .unwrap_or(false)
}

// =============================================================================
// TESTS
// =============================================================================
