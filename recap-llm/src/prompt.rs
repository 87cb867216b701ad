//! Prompt construction for the classification call.

use recap_core::SummaryJob;

/// Assemble the classifier prompt from a job's description, commits, and
/// diff. The diff is truncated at `max_diff_len` characters so oversized
/// changes cannot blow the provider's context budget.
pub fn build_prompt(job: &SummaryJob, max_diff_len: usize) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(
        "You are reviewing a code change. Summarize it as a single JSON object \
         with exactly these fields:\n\
         - \"what\": what the change does\n\
         - \"why\": why it was made\n\
         - \"impact\": the expected impact\n\
         - \"notes\": optional reviewer notes, or omit the field\n\n\
         If the provided material is not enough to produce a useful summary, \
         set \"what\", \"why\", and \"impact\" all to \"[NEEDS_INPUT]\".\n\n",
    );

    if let Some(description) = job.description.as_deref() {
        if !description.trim().is_empty() {
            prompt.push_str("Author description:\n");
            prompt.push_str(description.trim());
            prompt.push_str("\n\n");
        }
    }

    if !job.commits.is_empty() {
        prompt.push_str("Commit messages:\n");
        for commit in &job.commits {
            prompt.push_str("- ");
            prompt.push_str(commit.message.trim());
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    if let Some(diff) = job.diff.as_deref() {
        let truncated = truncate_at_boundary(diff, max_diff_len);
        prompt.push_str("Diff:\n");
        prompt.push_str(truncated);
        if truncated.len() < diff.len() {
            prompt.push_str("\n[diff truncated]");
        }
        prompt.push('\n');
    }

    prompt
}

/// Cut `s` to at most `max` bytes without splitting a UTF-8 character.
fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// =============================================================================
// TESTS
// =============================================================================
