use std::time::Duration;

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{ApiError, GitHubApi};
use crate::pr::{
    BaseBranch, CommitRequest, CompareResult, HeadBranch, NewCommit, PrUrl, PullRequestSnapshot,
};

const USER_AGENT: &str = "pr-squasher";
const ACCEPT: &str = "application/vnd.github.v3+json";
const API_VERSION: &str = "2022-11-28";

/// Build the shared HTTP client. Every request is bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// GitHub REST client authenticated with one user's bearer token.
///
/// Cheap to construct: the web service builds one per request from the
/// session's token and a clone of the shared `reqwest::Client`.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

#[derive(Deserialize)]
struct Owner {
    login: String,
}

#[derive(Deserialize)]
struct Repo {
    name: String,
    owner: Owner,
}

#[derive(Deserialize)]
struct PullHead {
    label: String,
    #[serde(rename = "ref")]
    git_ref: String,
    sha: String,
    /// Null when the fork behind the PR has been deleted
    repo: Option<Repo>,
}

#[derive(Deserialize)]
struct PullBase {
    label: String,
    repo: Repo,
}

#[derive(Deserialize)]
struct PullResponse {
    html_url: String,
    title: String,
    body: Option<String>,
    head: PullHead,
    base: PullBase,
}

#[derive(Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Deserialize)]
struct CompareResponse {
    url: String,
    ahead_by: u64,
    merge_base_commit: ShaRef,
}

#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaRef,
}

#[derive(Deserialize)]
struct CreatedCommit {
    sha: String,
    html_url: String,
}

#[derive(Serialize)]
struct RefUpdate<'a> {
    sha: &'a str,
    force: bool,
}

/// Percent-encode a branch name for a URL path, keeping its `/` separators.
/// Characters such as `#` or `?` would otherwise cut the path short.
fn encode_ref(name: &str) -> String {
    name.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Encode an `owner:branch` label, leaving the `:` separator readable.
fn encode_label(label: &str) -> String {
    match label.split_once(':') {
        Some((owner, branch)) => format!("{}:{}", urlencoding::encode(owner), encode_ref(branch)),
        None => encode_ref(label),
    }
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    #[instrument(skip(self))]
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(Self::failure(path, status, response).await);
        }
        debug!(status, "GitHub API request succeeded");
        Ok(response.json::<T>().await?)
    }

    #[instrument(skip(self, body))]
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            return Err(Self::failure(path, status, response).await);
        }
        debug!(status, "GitHub API request succeeded");
        Ok(response.json::<T>().await?)
    }

    async fn failure(path: &str, status: u16, response: reqwest::Response) -> ApiError {
        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_response(status, &body);
        warn!(path, status, error = %error, "GitHub API request failed");
        error
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn current_user(&self) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct User {
            login: String,
        }

        let user: User = self.get("user").await?;
        Ok(user.login)
    }

    async fn get_pull_request(&self, pr: &PrUrl) -> Result<PullRequestSnapshot, ApiError> {
        let path = format!("repos/{}/{}/pulls/{}", pr.owner, pr.repo, pr.pr_number);
        let pull: PullResponse = self.get(&path).await?;

        let head_repo = pull.head.repo.ok_or_else(|| {
            ApiError::Unexpected(format!(
                "the repository of head branch {} no longer exists",
                pull.head.label
            ))
        })?;

        Ok(PullRequestSnapshot {
            html_url: pull.html_url,
            title: pull.title,
            body: pull.body.unwrap_or_default(),
            head: HeadBranch {
                label: pull.head.label,
                git_ref: pull.head.git_ref,
                sha: pull.head.sha,
                repo_owner: head_repo.owner.login,
                repo_name: head_repo.name,
            },
            base: BaseBranch {
                label: pull.base.label,
                repo_owner: pull.base.repo.owner.login,
                repo_name: pull.base.repo.name,
            },
        })
    }

    async fn compare(
        &self,
        owner: &str,
        repo: &str,
        base_label: &str,
        head_label: &str,
    ) -> Result<CompareResult, ApiError> {
        let path = format!(
            "repos/{owner}/{repo}/compare/{}...{}",
            encode_label(base_label),
            encode_label(head_label)
        );
        let compare: CompareResponse = self.get(&path).await?;
        Ok(CompareResult {
            merge_base_sha: compare.merge_base_commit.sha,
            ahead_by: compare.ahead_by,
            url: compare.url,
        })
    }

    async fn get_commit_tree(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<String, ApiError> {
        let path = format!("repos/{owner}/{repo}/git/commits/{sha}");
        let commit: CommitResponse = self.get(&path).await?;
        Ok(commit.tree.sha)
    }

    async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        commit: &CommitRequest,
    ) -> Result<NewCommit, ApiError> {
        let path = format!("repos/{owner}/{repo}/git/commits");
        let created: CreatedCommit = self.post(&path, commit).await?;
        Ok(NewCommit {
            sha: created.sha,
            html_url: created.html_url,
        })
    }

    async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<(), ApiError> {
        let path = format!("repos/{owner}/{repo}/git/refs/heads/{}", encode_ref(branch));
        let _: IgnoredAny = self.post(&path, &RefUpdate { sha, force }).await?;
        Ok(())
    }
}
