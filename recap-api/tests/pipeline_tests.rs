//! End-to-end pipeline tests over the in-memory store and mock
//! collaborators: every early-exit outcome, the governed success path, and
//! the fail-open/fail-closed split.

use recap_api::{Orchestrator, COMMENT_MARKER};
use recap_core::{
    BreakerConfig, ClassifyError, CommitInfo, JobOutcome, RateLimitConfig, RecapConfig,
    RecapError, RetryConfig, SummaryJob, NEEDS_INPUT_SENTINEL,
};
use recap_llm::MockClassifier;
use recap_scm::{MockScmClient, ScmClient};
use recap_store::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    orchestrator: Orchestrator,
    store: Arc<InMemoryStore>,
    scm: Arc<MockScmClient>,
    classifier: Arc<MockClassifier>,
}

fn test_config() -> RecapConfig {
    RecapConfig {
        retry: RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
        },
        breaker: BreakerConfig {
            failure_threshold: 2,
            cool_down: Duration::from_secs(60),
        },
        rate_limit: RateLimitConfig {
            limit: 10,
            window: Duration::from_secs(3600),
        },
        ..RecapConfig::default()
    }
}

fn harness() -> Harness {
    harness_with(test_config())
}

fn harness_with(config: RecapConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let scm = Arc::new(MockScmClient::new());
    let classifier = Arc::new(MockClassifier::new());

    scm.set_diff("+".repeat(200));
    scm.set_commits(vec![CommitInfo {
        sha: "abc123".to_string(),
        message: "rework the limiter window arming".to_string(),
    }]);

    let orchestrator = Orchestrator::new(
        store.clone(),
        scm.clone(),
        classifier.clone(),
        config,
        vec!["no-summary".to_string(), "skip-summary".to_string()],
    );

    Harness {
        orchestrator,
        store,
        scm,
        classifier,
    }
}

fn job() -> SummaryJob {
    SummaryJob::new("acme", "widgets", 42, "abc123")
}

fn audited_actions(entries: &[recap_core::AuditLogEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.action.as_str()).collect()
}

#[tokio::test]
async fn test_success_path_classifies_caches_comments_and_audits() {
    let h = harness();

    let outcome = h.orchestrator.process(job()).await.unwrap();
    let JobOutcome::Completed { summary } = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(summary.what, "mock change");
    assert_eq!(h.classifier.calls(), 1);

    // Comment was created with the marker.
    let comments = h.scm.comments();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.contains(COMMENT_MARKER));
    assert!(comments[0].body.contains("mock change"));

    // Audit trail covers the generation and the comment.
    let entries = h.orchestrator.audit_range(0, i64::MAX).await.unwrap();
    let actions = audited_actions(&entries);
    assert!(actions.contains(&"summary_generated"));
    assert!(actions.contains(&"comment_created"));
}

#[tokio::test]
async fn test_redelivery_hits_cache_without_reclassifying() {
    let h = harness();

    let first = h.orchestrator.process(job()).await.unwrap();
    assert!(matches!(first, JobOutcome::Completed { .. }));

    let second = h.orchestrator.process(job()).await.unwrap();
    let JobOutcome::CacheHit { summary } = second else {
        panic!("expected cache hit");
    };
    assert_eq!(summary.what, "mock change");
    assert_eq!(h.classifier.calls(), 1);
    assert_eq!(h.scm.create_calls(), 1);
}

#[tokio::test]
async fn test_new_revision_is_a_fresh_job() {
    let h = harness();

    h.orchestrator.process(job()).await.unwrap();
    let new_revision = SummaryJob::new("acme", "widgets", 42, "def456");
    let outcome = h.orchestrator.process(new_revision).await.unwrap();

    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(h.classifier.calls(), 2);
    // Same marked comment updated, not duplicated.
    assert_eq!(h.scm.comments().len(), 1);
    assert_eq!(h.scm.update_calls(), 1);
}

#[tokio::test]
async fn test_skip_label_exits_before_any_governed_work() {
    let h = harness();
    let labeled = job().with_labels(vec!["feature".to_string(), "No-Summary".to_string()]);

    let outcome = h.orchestrator.process(labeled).await.unwrap();
    assert_eq!(outcome, JobOutcome::IgnoredByLabel);
    assert_eq!(h.classifier.calls(), 0);
    assert_eq!(h.scm.diff_calls(), 0);

    // Label skips do not consume rate budget.
    let entries = h.orchestrator.audit_range(0, i64::MAX).await.unwrap();
    assert_eq!(audited_actions(&entries), vec!["ignored_by_label"]);
}

#[tokio::test]
async fn test_rate_limit_exhaustion_early_exits() {
    let mut config = test_config();
    config.rate_limit.limit = 1;
    let h = harness_with(config);

    let first = h.orchestrator.process(job()).await.unwrap();
    assert!(matches!(first, JobOutcome::Completed { .. }));

    let second_revision = SummaryJob::new("acme", "widgets", 42, "def456");
    let outcome = h.orchestrator.process(second_revision).await.unwrap();
    let JobOutcome::RateLimited { status } = outcome else {
        panic!("expected rate limited outcome");
    };
    assert!(status.limited);
    assert_eq!(status.remaining, 0);
    assert_eq!(h.classifier.calls(), 1);
}

#[tokio::test]
async fn test_rate_limit_is_per_repository() {
    let mut config = test_config();
    config.rate_limit.limit = 1;
    let h = harness_with(config);

    h.orchestrator.process(job()).await.unwrap();

    let other_repo = SummaryJob::new("acme", "gadgets", 7, "fff000");
    let outcome = h.orchestrator.process(other_repo).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { .. }));
}

#[tokio::test]
async fn test_admin_reset_restores_budget() {
    let mut config = test_config();
    config.rate_limit.limit = 1;
    let h = harness_with(config);

    h.orchestrator.process(job()).await.unwrap();
    h.orchestrator.reset_rate_limit("acme", "widgets").await.unwrap();

    let second_revision = SummaryJob::new("acme", "widgets", 42, "def456");
    let outcome = h.orchestrator.process(second_revision).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { .. }));
}

#[tokio::test]
async fn test_thin_content_skips_classification() {
    let h = harness();
    h.scm.set_diff("+ x");
    h.scm.set_commits(vec![CommitInfo {
        sha: "abc123".to_string(),
        message: "wip".to_string(),
    }]);

    let outcome = h.orchestrator.process(job()).await.unwrap();
    assert_eq!(outcome, JobOutcome::InsufficientContent);
    assert_eq!(h.classifier.calls(), 0);
    assert!(h.scm.comments().is_empty());
}

#[tokio::test]
async fn test_needs_input_sentinel_is_insufficient_content() {
    let h = harness();
    h.classifier.push_summary(
        NEEDS_INPUT_SENTINEL,
        NEEDS_INPUT_SENTINEL,
        NEEDS_INPUT_SENTINEL,
    );

    let outcome = h.orchestrator.process(job()).await.unwrap();
    assert_eq!(outcome, JobOutcome::InsufficientContent);
    assert!(h.scm.comments().is_empty());

    // Not cached: a redelivery classifies again.
    h.classifier.push_summary("w", "y", "i");
    let retried = h.orchestrator.process(job()).await.unwrap();
    assert!(matches!(retried, JobOutcome::Completed { .. }));
    assert_eq!(h.classifier.calls(), 2);
}

#[tokio::test]
async fn test_breaker_opens_and_rejects_without_invoking_classifier() {
    let h = harness();

    for n in 0..2u64 {
        h.classifier.push_response(Err(ClassifyError::InvalidApiKey {
            provider: "mock".to_string(),
        }));
        let failing = SummaryJob::new("acme", "widgets", 42, format!("rev{}", n));
        let err = h.orchestrator.process(failing).await.unwrap_err();
        assert!(matches!(err, RecapError::Classify(_)));
    }
    assert_eq!(h.classifier.calls(), 2);

    let next = SummaryJob::new("acme", "widgets", 42, "rev2");
    let outcome = h.orchestrator.process(next).await.unwrap();
    assert_eq!(outcome, JobOutcome::CircuitOpen);
    assert_eq!(h.classifier.calls(), 2);

    let entries = h.orchestrator.audit_range(0, i64::MAX).await.unwrap();
    assert!(audited_actions(&entries).contains(&"circuit_open"));
}

#[tokio::test]
async fn test_transient_classifier_failures_are_retried_within_one_event() {
    let h = harness();
    h.classifier.push_response(Err(ClassifyError::UpstreamStatus {
        provider: "mock".to_string(),
        status: 503,
        message: "overloaded".to_string(),
    }));
    h.classifier.push_summary("w", "y", "i");

    let outcome = h.orchestrator.process(job()).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(h.classifier.calls(), 2);
}

#[tokio::test]
async fn test_transient_scm_failures_are_retried() {
    let h = harness();
    h.scm.push_diff_error(recap_core::ScmError::Timeout {
        host: "mock".to_string(),
    });

    let outcome = h.orchestrator.process(job()).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(h.scm.diff_calls(), 2);
}

#[tokio::test]
async fn test_fatal_scm_error_aborts_event() {
    let h = harness();
    h.scm.push_diff_error(recap_core::ScmError::NotFound {
        resource: "acme/widgets#42".to_string(),
    });

    let err = h.orchestrator.process(job()).await.unwrap_err();
    assert!(matches!(err, RecapError::Scm(_)));
    assert_eq!(h.scm.diff_calls(), 1);
    assert_eq!(h.classifier.calls(), 0);
}

#[tokio::test]
async fn test_malformed_classifier_response_is_fatal() {
    let h = harness();
    h.classifier
        .push_response(Ok("no structured summary here".to_string()));

    let err = h.orchestrator.process(job()).await.unwrap_err();
    assert!(matches!(
        err,
        RecapError::Classify(ClassifyError::MalformedResponse { .. })
    ));
    assert!(h.scm.comments().is_empty());
}

#[tokio::test]
async fn test_store_outage_fails_open_end_to_end() {
    let h = harness();
    h.store.set_failing(true);

    // Limiter permits, cache misses, audit swallows: the event completes.
    let outcome = h.orchestrator.process(job()).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(h.classifier.calls(), 1);
    assert_eq!(h.scm.comments().len(), 1);
}

#[tokio::test]
async fn test_pre_fetched_content_skips_scm_reads() {
    let h = harness();
    let prefetched = job()
        .with_diff("+".repeat(200))
        .with_commits(vec![CommitInfo {
            sha: "abc123".to_string(),
            message: "prefetched commit message".to_string(),
        }]);

    let outcome = h.orchestrator.process(prefetched).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(h.scm.diff_calls(), 0);
    assert_eq!(h.scm.commit_calls(), 0);
}

#[tokio::test]
async fn test_existing_marked_comment_is_updated_not_duplicated() {
    let h = harness();
    h.scm
        .create_comment("acme", "widgets", 42, &format!("{}\nstale body", COMMENT_MARKER))
        .await
        .unwrap();

    let outcome = h.orchestrator.process(job()).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { .. }));

    let comments = h.scm.comments();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.contains("mock change"));
    assert_eq!(h.scm.update_calls(), 1);
    assert_eq!(h.scm.create_calls(), 1);
}

#[tokio::test]
async fn test_audit_trail_orders_most_recent_first() {
    let h = harness();
    h.orchestrator.process(job()).await.unwrap();
    h.orchestrator.process(job()).await.unwrap();

    let entries = h.orchestrator.audit_range(0, i64::MAX).await.unwrap();
    assert!(entries.len() >= 2);
    for pair in entries.windows(2) {
        assert!(pair[0].timestamp_epoch_ms >= pair[1].timestamp_epoch_ms);
    }
}
