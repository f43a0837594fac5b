pub mod client;

pub use client::{build_http_client, GitHubClient};

use async_trait::async_trait;
use thiserror::Error;

use crate::pr::{CommitRequest, CompareResult, NewCommit, PrUrl, PullRequestSnapshot};

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 or 403: the token is missing, expired or lacks scope.
    #[error("{message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected GitHub API response: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// HTTP status of a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. } | ApiError::Status { status, .. } => {
                Some(*status)
            }
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            ApiError::Unexpected(_) => None,
        }
    }

    /// Classify a non-success response, deriving the message from its body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = failure_message(status, body);
        match status {
            401 | 403 => ApiError::Unauthorized { status, message },
            _ => ApiError::Status { status, message },
        }
    }
}

/// Human-readable reason for a failed request.
///
/// OAuth-style bodies carry `error`/`error_description`, REST bodies carry
/// `message`; anything else falls back to the status code.
pub fn failure_message(status: u16, body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).unwrap_or_default();

    if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
        return match value.get("error_description").and_then(|d| d.as_str()) {
            Some(description) => format!("{error}: {description}"),
            None => error.to_string(),
        };
    }
    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
        return message.to_string();
    }
    format!("Request failed with code {status}")
}

/// The GitHub REST calls a squash needs, one method per request.
/// Implementations must be Send + Sync so handlers can hold them across awaits.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Login of the user the token belongs to (`GET /user`).
    async fn current_user(&self) -> Result<String, ApiError>;

    /// `GET /repos/{owner}/{repo}/pulls/{number}`
    async fn get_pull_request(&self, pr: &PrUrl) -> Result<PullRequestSnapshot, ApiError>;

    /// `GET /repos/{owner}/{repo}/compare/{base}...{head}`
    async fn compare(
        &self,
        owner: &str,
        repo: &str,
        base_label: &str,
        head_label: &str,
    ) -> Result<CompareResult, ApiError>;

    /// Tree id of a commit (`GET /repos/{owner}/{repo}/git/commits/{sha}`).
    async fn get_commit_tree(&self, owner: &str, repo: &str, sha: &str)
        -> Result<String, ApiError>;

    /// `POST /repos/{owner}/{repo}/git/commits`
    async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        commit: &CommitRequest,
    ) -> Result<NewCommit, ApiError>;

    /// Point `heads/{branch}` at `sha` (`POST /repos/{owner}/{repo}/git/refs/heads/{branch}`).
    async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<(), ApiError>;
}
