//! Webhook surface.
//!
//! A single POST endpoint receives change-request events, normalizes them
//! into summarization jobs, and runs them through the orchestrator. The
//! response is always a JSON outcome envelope; fatal processing errors
//! are logged and reported in the envelope rather than retried - the
//! outer delivery guarantee is at-most-once per event.
//!
//! Administrative routes expose the audit-trail read and the rate-limit
//! reset override.

use crate::error::{ApiError, ApiResult};
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use recap_core::{AuditLogEntry, SummaryJob};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Change-request actions that trigger summarization.
const HANDLED_ACTIONS: &[&str] = &["opened", "synchronize", "reopened", "ready_for_review"];

// ============================================================================
// EVENT PAYLOAD
// ============================================================================

/// Subset of the forge's pull-request event payload that the service
/// consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub head: CommitRef,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: RepositoryOwner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

impl From<PullRequestEvent> for SummaryJob {
    fn from(event: PullRequestEvent) -> Self {
        let mut job = SummaryJob::new(
            event.repository.owner.login,
            event.repository.name,
            event.pull_request.number,
            event.pull_request.head.sha,
        )
        .with_labels(
            event
                .pull_request
                .labels
                .into_iter()
                .map(|l| l.name)
                .collect(),
        );
        if let Some(body) = event.pull_request.body.filter(|b| !b.trim().is_empty()) {
            job = job.with_description(body);
        }
        job
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Shared state behind the router.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the service router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/webhooks/github", post(handle_pull_request))
        .route("/admin/audit", get(query_audit))
        .route("/admin/rate/:owner/:repo", delete(reset_rate_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// WEBHOOK HANDLER
// ============================================================================

async fn handle_pull_request(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PullRequestEvent>,
) -> Json<JsonValue> {
    if !HANDLED_ACTIONS.contains(&event.action.as_str()) {
        tracing::debug!(action = %event.action, "ignoring unhandled action");
        return Json(json!({ "outcome": "ignored_action" }));
    }

    let job = SummaryJob::from(event);
    let resource = format!("{}/{}#{}", job.owner, job.repo, job.job_id);

    match state.orchestrator.process(job).await {
        Ok(outcome) => {
            tracing::info!(resource = %resource, outcome = outcome.as_str(), "event processed");
            match serde_json::to_value(&outcome) {
                Ok(value) => Json(value),
                Err(err) => {
                    tracing::error!(resource = %resource, error = %err, "failed to serialize outcome");
                    Json(json!({ "outcome": "failed" }))
                }
            }
        }
        Err(err) => {
            // At-most-once per event: report and complete, never retry here.
            tracing::error!(resource = %resource, error = %err, "event processing failed");
            Json(json!({ "outcome": "failed", "error": err.to_string() }))
        }
    }
}

// ============================================================================
// ADMIN HANDLERS
// ============================================================================

#[derive(Debug, Deserialize)]
struct AuditRangeParams {
    start_ms: Option<i64>,
    end_ms: Option<i64>,
}

async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditRangeParams>,
) -> ApiResult<Json<Vec<AuditLogEntry>>> {
    let end_ms = params
        .end_ms
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    let start_ms = params.start_ms.unwrap_or(end_ms - 60 * 60 * 1000);

    if start_ms > end_ms {
        return Err(ApiError::invalid_input("start_ms must not exceed end_ms"));
    }

    let entries = state.orchestrator.audit_range(start_ms, end_ms).await?;
    Ok(Json(entries))
}

async fn reset_rate_limit(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.orchestrator.reset_rate_limit(&owner, &repo).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event_json(action: &str) -> String {
        format!(
            r#"{{
                "action": "{}",
                "pull_request": {{
                    "number": 42,
                    "body": "Reworks the limiter window arming.",
                    "head": {{ "sha": "abc123" }},
                    "labels": [ {{ "name": "feature" }}, {{ "name": "no-summary" }} ]
                }},
                "repository": {{
                    "name": "widgets",
                    "owner": {{ "login": "acme" }}
                }}
            }}"#,
            action
        )
    }

    #[test]
    fn test_event_deserializes() {
        let event: PullRequestEvent = serde_json::from_str(&event_json("opened")).unwrap();
        assert_eq!(event.action, "opened");
        assert_eq!(event.pull_request.number, 42);
        assert_eq!(event.repository.owner.login, "acme");
    }

    #[test]
    fn test_event_converts_to_job() {
        let event: PullRequestEvent = serde_json::from_str(&event_json("opened")).unwrap();
        let job = SummaryJob::from(event);
        assert_eq!(job.owner, "acme");
        assert_eq!(job.repo, "widgets");
        assert_eq!(job.job_id, 42);
        assert_eq!(job.content_revision, "abc123");
        assert_eq!(job.labels, vec!["feature".to_string(), "no-summary".to_string()]);
        assert_eq!(job.description.as_deref(), Some("Reworks the limiter window arming."));
        assert!(job.diff.is_none());
    }

    #[test]
    fn test_blank_body_becomes_no_description() {
        let json = r#"{
            "action": "opened",
            "pull_request": { "number": 1, "body": "  ", "head": { "sha": "s" } },
            "repository": { "name": "r", "owner": { "login": "o" } }
        }"#;
        let event: PullRequestEvent = serde_json::from_str(json).unwrap();
        let job = SummaryJob::from(event);
        assert!(job.description.is_none());
        assert!(job.labels.is_empty());
    }

    #[test]
    fn test_handled_actions() {
        for action in ["opened", "synchronize", "reopened", "ready_for_review"] {
            assert!(HANDLED_ACTIONS.contains(&action));
        }
        assert!(!HANDLED_ACTIONS.contains(&"closed"));
        assert!(!HANDLED_ACTIONS.contains(&"labeled"));
    }
}
