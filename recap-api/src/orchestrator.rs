//! Job orchestration.
//!
//! Sequences one summarization job through the governance layer:
//! label filter, rate-limit check, cache lookup, fetch, content
//! validation, guarded classification, cache write, comment upsert, and
//! the audit trail. Data flows one direction - no component calls back
//! into the orchestrator - and every early exit is itself a valid
//! outcome.

use recap_core::{
    has_meaningful_content, AuditLogEntry, ChangeSummary, CircuitBreaker, ClassifyError,
    Idempotent, JobOutcome, RecapConfig, RecapResult, RetryExecutor, StoreError, SummaryJob,
};
use recap_llm::{build_prompt, parse_summary, ClassifierGuard, ClassifierProvider};
use recap_scm::ScmClient;
use recap_store::{AuditLog, RateLimiter, StoreBackend, SummaryCache, SummaryKey};
use std::sync::Arc;

/// Actor recorded on audit entries written by the service itself.
const ACTOR: &str = "recap";

/// Hidden marker identifying the service's own comment, so redeliveries
/// update it instead of stacking duplicates.
pub const COMMENT_MARKER: &str = "<!-- recap:summary -->";

/// The per-event pipeline over the governance components.
pub struct Orchestrator {
    limiter: RateLimiter,
    cache: SummaryCache,
    audit: AuditLog,
    scm: Arc<dyn ScmClient>,
    classifier: ClassifierGuard,
    retry: RetryExecutor,
    config: RecapConfig,
    skip_labels: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn StoreBackend>,
        scm: Arc<dyn ScmClient>,
        provider: Arc<dyn ClassifierProvider>,
        config: RecapConfig,
        skip_labels: Vec<String>,
    ) -> Self {
        let retry = RetryExecutor::new(config.retry.clone());
        let breaker = CircuitBreaker::new(config.breaker.clone());

        Self {
            limiter: RateLimiter::new(store.clone(), config.rate_limit.clone()),
            cache: SummaryCache::new(store.clone(), config.cache.clone()),
            audit: AuditLog::new(store, config.audit.clone()),
            scm,
            classifier: ClassifierGuard::new(provider, breaker, retry.clone()),
            retry,
            config,
            skip_labels,
        }
    }

    /// Process one job to a terminal outcome.
    ///
    /// Early exits short-circuit everything downstream of their stage; a
    /// fatal or retry-exhausted upstream error aborts the event and
    /// propagates to the invoking collaborator.
    pub async fn process(&self, mut job: SummaryJob) -> RecapResult<JobOutcome> {
        let resource = format!("{}/{}#{}", job.owner, job.repo, job.job_id);
        let revision = job.content_revision.clone();

        if let Some(label) = self.matching_skip_label(&job) {
            tracing::info!(resource = %resource, label = %label, "skipping labeled change request");
            self.audit
                .append(
                    &AuditLogEntry::new(&revision, ACTOR, "ignored_by_label", &resource)
                        .with_detail("label", label),
                )
                .await;
            return Ok(JobOutcome::IgnoredByLabel);
        }

        let status = self.limiter.check_and_increment(&job.owner, &job.repo).await;
        if status.limited {
            self.audit
                .append(
                    &AuditLogEntry::new(&revision, ACTOR, "rate_limited", &resource)
                        .with_detail("limit", status.limit)
                        .with_detail("reset_at_epoch_ms", status.reset_at_epoch_ms),
                )
                .await;
            return Ok(JobOutcome::RateLimited { status });
        }

        let key = SummaryKey::new(&job.owner, &job.repo, job.job_id, &job.content_revision);
        if let Some(summary) = self.cache.get(&key).await {
            self.audit
                .append(&AuditLogEntry::new(&revision, ACTOR, "cache_hit", &resource))
                .await;
            return Ok(JobOutcome::CacheHit { summary });
        }

        let diff = match job.diff.take() {
            Some(diff) => diff,
            None => {
                self.retry
                    .run(
                        "fetch_diff",
                        Idempotent::new(|| self.scm.fetch_diff(&job.owner, &job.repo, job.job_id)),
                    )
                    .await?
            }
        };
        let commits = if job.commits.is_empty() {
            self.retry
                .run(
                    "fetch_commits",
                    Idempotent::new(|| self.scm.fetch_commits(&job.owner, &job.repo, job.job_id)),
                )
                .await?
        } else {
            std::mem::take(&mut job.commits)
        };

        if !has_meaningful_content(&diff, &commits, job.description.as_deref(), &self.config.content)
        {
            self.audit
                .append(
                    &AuditLogEntry::new(&revision, ACTOR, "insufficient_content", &resource)
                        .with_detail("source", "heuristic"),
                )
                .await;
            return Ok(JobOutcome::InsufficientContent);
        }

        let job = job.with_diff(diff).with_commits(commits);
        let prompt = build_prompt(&job, self.config.content.max_diff_len);

        let text = match self.classifier.classify(&prompt).await {
            Ok(text) => text,
            Err(ClassifyError::CircuitOpen) => {
                self.audit
                    .append(&AuditLogEntry::new(&revision, ACTOR, "circuit_open", &resource))
                    .await;
                return Ok(JobOutcome::CircuitOpen);
            }
            Err(err) => {
                self.audit
                    .append(
                        &AuditLogEntry::new(&revision, ACTOR, "classification_failed", &resource)
                            .with_detail("error", err.to_string()),
                    )
                    .await;
                return Err(err.into());
            }
        };

        let summary = match parse_summary(self.classifier.provider_id(), &text) {
            Ok(summary) => summary,
            Err(err) => {
                self.audit
                    .append(
                        &AuditLogEntry::new(&revision, ACTOR, "classification_failed", &resource)
                            .with_detail("error", err.to_string()),
                    )
                    .await;
                return Err(err.into());
            }
        };

        if summary.needs_input() {
            self.audit
                .append(
                    &AuditLogEntry::new(&revision, ACTOR, "insufficient_content", &resource)
                        .with_detail("source", "classifier"),
                )
                .await;
            return Ok(JobOutcome::InsufficientContent);
        }

        self.cache.put(&key, &summary).await;
        self.publish_comment(&job, &summary, &revision, &resource).await?;

        self.audit
            .append(&AuditLogEntry::new(&revision, ACTOR, "summary_generated", &resource))
            .await;

        Ok(JobOutcome::Completed { summary })
    }

    /// Administrative override: clear a repository's rate-limit window.
    pub async fn reset_rate_limit(&self, owner: &str, repo: &str) -> Result<(), StoreError> {
        self.limiter.reset(owner, repo).await?;
        self.audit
            .append(&AuditLogEntry::new(
                "admin",
                "admin",
                "rate_limit_reset",
                format!("{}/{}", owner, repo),
            ))
            .await;
        Ok(())
    }

    /// Administrative read of the audit trail.
    pub async fn audit_range(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        self.audit.query_range(start_ms, end_ms).await
    }

    fn matching_skip_label(&self, job: &SummaryJob) -> Option<String> {
        job.labels
            .iter()
            .find(|label| {
                self.skip_labels
                    .iter()
                    .any(|skip| skip.eq_ignore_ascii_case(label))
            })
            .cloned()
    }

    /// Upsert the result comment: update the marked comment when present,
    /// create it otherwise. Safe under redelivery because the marker makes
    /// the create path effectively once-per-change-request.
    async fn publish_comment(
        &self,
        job: &SummaryJob,
        summary: &ChangeSummary,
        revision: &str,
        resource: &str,
    ) -> RecapResult<()> {
        let body = render_comment(summary);

        let existing = self
            .retry
            .run(
                "list_comments",
                Idempotent::new(|| self.scm.list_comments(&job.owner, &job.repo, job.job_id)),
            )
            .await?;

        let marked = existing.iter().find(|c| c.body.contains(COMMENT_MARKER));

        let (action, comment_id) = match marked {
            Some(comment) => {
                let updated = self
                    .retry
                    .run(
                        "update_comment",
                        Idempotent::new(|| {
                            self.scm
                                .update_comment(&job.owner, &job.repo, comment.id, &body)
                        }),
                    )
                    .await?;
                ("comment_updated", updated.id)
            }
            None => {
                let created = self
                    .retry
                    .run(
                        "create_comment",
                        Idempotent::new(|| {
                            self.scm
                                .create_comment(&job.owner, &job.repo, job.job_id, &body)
                        }),
                    )
                    .await?;
                ("comment_created", created.id)
            }
        };

        self.audit
            .append(
                &AuditLogEntry::new(revision, ACTOR, action, resource)
                    .with_detail("comment_id", comment_id),
            )
            .await;
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("limiter", &self.limiter)
            .field("classifier", &self.classifier)
            .field("skip_labels", &self.skip_labels)
            .finish()
    }
}

/// Render the result comment body.
pub fn render_comment(summary: &ChangeSummary) -> String {
    let mut body = format!(
        "{}\n## Change Summary\n\n**What:** {}\n\n**Why:** {}\n\n**Impact:** {}\n",
        COMMENT_MARKER, summary.what, summary.why, summary.impact
    );
    if let Some(notes) = summary.notes.as_deref() {
        body.push_str("\n**Notes:** ");
        body.push_str(notes);
        body.push('\n');
    }
    body
}

// =============================================================================
// TESTS
// =============================================================================
