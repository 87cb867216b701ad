//! Extraction of the structured summary from free-form classifier output.
//!
//! Models wrap their JSON in prose, code fences, or both. The parser
//! scans the text for balanced JSON objects and takes the first one that
//! carries the required fields; anything else is a fatal
//! `MalformedResponse`.

use recap_core::{ChangeSummary, ClassifyError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawSummary {
    what: Option<String>,
    why: Option<String>,
    impact: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// Parse the classifier's response text into a [`ChangeSummary`].
///
/// The required fields are `what`, `why`, and `impact`; `notes` is
/// optional. The needs-input sentinel is a valid value here - deciding
/// what to do with it is the orchestrator's job.
pub fn parse_summary(provider: &str, text: &str) -> Result<ChangeSummary, ClassifyError> {
    for candidate in json_object_candidates(text) {
        let Ok(raw) = serde_json::from_str::<RawSummary>(candidate) else {
            continue;
        };
        let (Some(what), Some(why), Some(impact)) = (raw.what, raw.why, raw.impact) else {
            continue;
        };
        return Ok(ChangeSummary {
            what,
            why,
            impact,
            notes: raw.notes.filter(|n| !n.trim().is_empty()),
        });
    }

    Err(ClassifyError::MalformedResponse {
        provider: provider.to_string(),
        reason: "no JSON object with what/why/impact fields".to_string(),
    })
}

/// All balanced `{...}` spans in `text`, in order of appearance.
/// Brace counting ignores braces inside JSON strings.
fn json_object_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        match balanced_object_end(&text[start..]) {
            Some(len) => {
                candidates.push(&text[start..start + len]);
                search_from = start + len;
            }
            None => {
                search_from = start + 1;
            }
        }
    }

    candidates
}

/// Length of the balanced object starting at the first byte of `s`
/// (which must be `{`), or None if it never closes.
fn balanced_object_end(s: &str) -> Option<usize> {
    let mut depth: u32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
