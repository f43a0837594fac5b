use serde::Serialize;

/// Represents the parsed components of a GitHub PR URL.
/// Extracted by parse_pr_url() in pr/mod.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrUrl {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
}

/// The head side of a pull request: the branch that gets rewritten.
#[derive(Debug, Clone)]
pub struct HeadBranch {
    /// `owner:branch` label (e.g., "alice:feature")
    pub label: String,
    /// Branch name without owner (e.g., "feature")
    pub git_ref: String,
    /// Commit the branch currently points at
    pub sha: String,
    /// Owner login of the repository holding the branch
    pub repo_owner: String,
    /// Name of the repository holding the branch
    pub repo_name: String,
}

/// The base side of a pull request: the branch it wants to merge into.
#[derive(Debug, Clone)]
pub struct BaseBranch {
    pub label: String,
    pub repo_owner: String,
    pub repo_name: String,
}

/// Pull request metadata as fetched once per squash attempt.
/// Not Deserialize: built by the GitHub client from the REST response.
#[derive(Debug, Clone)]
pub struct PullRequestSnapshot {
    /// Browser URL of the pull request
    pub html_url: String,
    pub title: String,
    /// Description, empty when GitHub returns null
    pub body: String,
    pub head: HeadBranch,
    pub base: BaseBranch,
}

impl PullRequestSnapshot {
    /// Commit message of the squashed commit: title, blank line, body.
    pub fn squash_message(&self) -> String {
        format!("{}\r\n\r\n{}", self.title, self.body)
    }
}

/// Divergence of the head branch from its merge base.
#[derive(Debug, Clone)]
pub struct CompareResult {
    pub merge_base_sha: String,
    /// Commits on head that are not on base
    pub ahead_by: u64,
    /// API URL of the comparison, quoted in failure messages
    pub url: String,
}

/// Identity recorded as the committer of the squashed commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

/// Body of `POST /repos/{owner}/{repo}/git/commits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRequest {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
    pub committer: Committer,
}

/// A commit object created through the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub sha: String,
    pub html_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(body: &str) -> PullRequestSnapshot {
        PullRequestSnapshot {
            html_url: "https://github.com/org/repo/pull/42".to_string(),
            title: "Add OAuth2 login flow".to_string(),
            body: body.to_string(),
            head: HeadBranch {
                label: "alice:oauth".to_string(),
                git_ref: "oauth".to_string(),
                sha: "1111111111".to_string(),
                repo_owner: "alice".to_string(),
                repo_name: "repo".to_string(),
            },
            base: BaseBranch {
                label: "org:main".to_string(),
                repo_owner: "org".to_string(),
                repo_name: "repo".to_string(),
            },
        }
    }

    #[test]
    fn test_squash_message_joins_title_and_body() {
        let message = snapshot("Implements the callback.").squash_message();
        assert_eq!(message, "Add OAuth2 login flow\r\n\r\nImplements the callback.");
    }

    #[test]
    fn test_squash_message_with_empty_body() {
        let message = snapshot("").squash_message();
        assert_eq!(message, "Add OAuth2 login flow\r\n\r\n");
    }

    #[test]
    fn test_commit_request_serializes_github_shape() {
        let request = CommitRequest {
            message: "msg".to_string(),
            tree: "def5678".to_string(),
            parents: vec!["abc1234".to_string()],
            committer: Committer {
                name: "Squasher bot".to_string(),
                email: "bot@example.com".to_string(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tree"], "def5678");
        assert_eq!(value["parents"], serde_json::json!(["abc1234"]));
        assert_eq!(value["committer"]["name"], "Squasher bot");
    }
}
