//! GitHub implementation of the repository client.

use crate::{CommentInfo, ScmClient};
use async_trait::async_trait;
use recap_core::{CommitInfo, ScmError};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const HOST: &str = "api.github.com";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct PullCommit {
    sha: String,
    commit: PullCommitDetail,
}

#[derive(Debug, Deserialize)]
struct PullCommitDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    id: u64,
    body: Option<String>,
}

impl From<IssueComment> for CommentInfo {
    fn from(comment: IssueComment) -> Self {
        Self {
            id: comment.id,
            body: comment.body.unwrap_or_default(),
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Repository client over the GitHub REST API.
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent("recap")
                .build()
                .unwrap_or_default(),
            token: token.into(),
            base_url: format!("https://{}", HOST),
        }
    }

    /// Override the base URL (GitHub Enterprise, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn pull_url(&self, owner: &str, repo: &str, number: u64, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}{}",
            self.base_url, owner, repo, number, suffix
        )
    }

    fn issue_comments_url(&self, owner: &str, repo: &str, number: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.base_url, owner, repo, number
        )
    }

    fn comment_url(&self, owner: &str, repo: &str, comment_id: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/comments/{}",
            self.base_url, owner, repo, comment_id
        )
    }

    fn map_transport_error(err: reqwest::Error) -> ScmError {
        if err.is_timeout() {
            ScmError::Timeout {
                host: HOST.to_string(),
            }
        } else {
            ScmError::Connection {
                host: HOST.to_string(),
                reason: err.to_string(),
            }
        }
    }

    fn map_status_error(status: StatusCode, resource: &str, body: &str) -> ScmError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ScmError::RateLimited {
                host: HOST.to_string(),
            },
            StatusCode::NOT_FOUND => ScmError::NotFound {
                resource: resource.to_string(),
            },
            // Secondary rate limits arrive as 403 with a retry-after hint;
            // treated as the plain rate-limited class.
            StatusCode::FORBIDDEN if body.contains("rate limit") => ScmError::RateLimited {
                host: HOST.to_string(),
            },
            _ => ScmError::UpstreamStatus {
                host: HOST.to_string(),
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            },
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<reqwest::Response, ScmError> {
        let response = request
            .header("authorization", format!("Bearer {}", self.token))
            .header("x-github-api-version", "2022-11-28")
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(resource = %resource, status = status.as_u16(), "repository API call failed");
            Err(Self::map_status_error(status, resource, &body))
        }
    }
}

#[async_trait]
impl ScmClient for GitHubClient {
    async fn fetch_diff(&self, owner: &str, repo: &str, number: u64) -> Result<String, ScmError> {
        let resource = format!("{}/{}#{}", owner, repo, number);
        let request = self
            .client
            .get(self.pull_url(owner, repo, number, ""))
            .header("accept", DIFF_MEDIA_TYPE);

        let response = self.send(request, &resource).await?;
        response.text().await.map_err(Self::map_transport_error)
    }

    async fn fetch_commits(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommitInfo>, ScmError> {
        let resource = format!("{}/{}#{} commits", owner, repo, number);
        let request = self
            .client
            .get(self.pull_url(owner, repo, number, "/commits"))
            .header("accept", JSON_MEDIA_TYPE);

        let response = self.send(request, &resource).await?;
        let commits: Vec<PullCommit> =
            response.json().await.map_err(Self::map_transport_error)?;

        Ok(commits
            .into_iter()
            .map(|c| CommitInfo {
                sha: c.sha,
                message: c.commit.message,
            })
            .collect())
    }

    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<CommentInfo, ScmError> {
        let resource = format!("{}/{}#{} comments", owner, repo, number);
        let request = self
            .client
            .post(self.issue_comments_url(owner, repo, number))
            .header("accept", JSON_MEDIA_TYPE)
            .json(&serde_json::json!({ "body": body }));

        let response = self.send(request, &resource).await?;
        let comment: IssueComment = response.json().await.map_err(Self::map_transport_error)?;
        Ok(comment.into())
    }

    async fn update_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<CommentInfo, ScmError> {
        let resource = format!("{}/{} comment {}", owner, repo, comment_id);
        let request = self
            .client
            .patch(self.comment_url(owner, repo, comment_id))
            .header("accept", JSON_MEDIA_TYPE)
            .json(&serde_json::json!({ "body": body }));

        let response = self.send(request, &resource).await?;
        let comment: IssueComment = response.json().await.map_err(Self::map_transport_error)?;
        Ok(comment.into())
    }

    async fn list_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommentInfo>, ScmError> {
        let resource = format!("{}/{}#{} comments", owner, repo, number);
        let request = self
            .client
            .get(self.issue_comments_url(owner, repo, number))
            .header("accept", JSON_MEDIA_TYPE);

        let response = self.send(request, &resource).await?;
        let comments: Vec<IssueComment> =
            response.json().await.map_err(Self::map_transport_error)?;
        Ok(comments.into_iter().map(CommentInfo::from).collect())
    }

    fn host(&self) -> &str {
        HOST
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
