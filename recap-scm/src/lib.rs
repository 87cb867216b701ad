//! RECAP SCM - Source-Repository Client Boundary
//!
//! Narrow trait over the repository API operations the orchestrator
//! needs: diff retrieval, commit retrieval, and comment create/update/
//! list. Every operation is idempotent or safely repeatable, so call
//! sites may wrap them in the retry executor.
//!
//! The GitHub implementation lives in [`github`]; [`MockScmClient`]
//! serves tests.

pub mod github;

pub use github::GitHubClient;

use async_trait::async_trait;
use recap_core::{CommitInfo, ScmError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// A change-request comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentInfo {
    pub id: u64,
    pub body: String,
}

/// Trait for source-repository clients.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ScmClient: Send + Sync {
    /// Fetch the unified diff of a change request.
    async fn fetch_diff(&self, owner: &str, repo: &str, number: u64) -> Result<String, ScmError>;

    /// Fetch the commits of a change request.
    async fn fetch_commits(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommitInfo>, ScmError>;

    /// Create a comment on a change request.
    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<CommentInfo, ScmError>;

    /// Replace the body of an existing comment.
    async fn update_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<CommentInfo, ScmError>;

    /// List the comments on a change request.
    async fn list_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommentInfo>, ScmError>;

    /// Host identifier used in logs and error messages.
    fn host(&self) -> &str;
}

// ============================================================================
// MOCK CLIENT FOR TESTING
// ============================================================================

/// Mock repository client with scripted content and call counters.
pub struct MockScmClient {
    diff: Mutex<String>,
    commits: Mutex<Vec<CommitInfo>>,
    comments: Mutex<Vec<CommentInfo>>,
    diff_errors: Mutex<VecDeque<ScmError>>,
    next_comment_id: AtomicU32,
    diff_calls: AtomicU32,
    commit_calls: AtomicU32,
    create_calls: AtomicU32,
    update_calls: AtomicU32,
}

impl MockScmClient {
    pub fn new() -> Self {
        Self {
            diff: Mutex::new(String::new()),
            commits: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
            diff_errors: Mutex::new(VecDeque::new()),
            next_comment_id: AtomicU32::new(1),
            diff_calls: AtomicU32::new(0),
            commit_calls: AtomicU32::new(0),
            create_calls: AtomicU32::new(0),
            update_calls: AtomicU32::new(0),
        }
    }

    pub fn set_diff(&self, diff: impl Into<String>) {
        *lock(&self.diff) = diff.into();
    }

    pub fn set_commits(&self, commits: Vec<CommitInfo>) {
        *lock(&self.commits) = commits;
    }

    /// Queue an error for the next `fetch_diff` call; once drained, calls
    /// succeed with the configured diff.
    pub fn push_diff_error(&self, error: ScmError) {
        lock(&self.diff_errors).push_back(error);
    }

    pub fn comments(&self) -> Vec<CommentInfo> {
        lock(&self.comments).clone()
    }

    pub fn diff_calls(&self) -> u32 {
        self.diff_calls.load(Ordering::SeqCst)
    }

    pub fn commit_calls(&self) -> u32 {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockScmClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl ScmClient for MockScmClient {
    async fn fetch_diff(&self, _owner: &str, _repo: &str, _number: u64) -> Result<String, ScmError> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.diff_errors).pop_front() {
            return Err(err);
        }
        Ok(lock(&self.diff).clone())
    }

    async fn fetch_commits(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<CommitInfo>, ScmError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.commits).clone())
    }

    async fn create_comment(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        body: &str,
    ) -> Result<CommentInfo, ScmError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let comment = CommentInfo {
            id: self.next_comment_id.fetch_add(1, Ordering::SeqCst) as u64,
            body: body.to_string(),
        };
        lock(&self.comments).push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(
        &self,
        _owner: &str,
        _repo: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<CommentInfo, ScmError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut comments = lock(&self.comments);
        match comments.iter_mut().find(|c| c.id == comment_id) {
            Some(comment) => {
                comment.body = body.to_string();
                Ok(comment.clone())
            }
            None => Err(ScmError::NotFound {
                resource: format!("comment {}", comment_id),
            }),
        }
    }

    async fn list_comments(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<CommentInfo>, ScmError> {
        Ok(lock(&self.comments).clone())
    }

    fn host(&self) -> &str {
        "mock"
    }
}

impl std::fmt::Debug for MockScmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockScmClient")
            .field("diff_calls", &self.diff_calls())
            .field("comments", &lock(&self.comments).len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
