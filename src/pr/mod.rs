pub mod types;

pub use types::{
    BaseBranch, CommitRequest, CompareResult, Committer, HeadBranch, NewCommit, PrUrl,
    PullRequestSnapshot,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("Does not look like a pull request url: “{0}”")]
    InvalidUrl(String),
}

/// Parse a pull request URL into its component parts.
///
/// Expected format: https://{host}/{owner}/{repo}/pull/{number}, where `host`
/// is the configured web host. Trailing segments such as `/files` or
/// `/commits`, a query and a fragment are ignored.
pub fn parse_pr_url(url: &str, host: &str) -> Result<PrUrl, PrError> {
    let invalid = || PrError::InvalidUrl(url.to_string());

    let parsed = reqwest::Url::parse(url.trim()).map_err(|_| invalid())?;

    if parsed.scheme() != "https" || parsed.port().is_some() {
        return Err(invalid());
    }
    if !parsed
        .host_str()
        .is_some_and(|h| h.eq_ignore_ascii_case(host))
    {
        return Err(invalid());
    }

    let segments: Vec<_> = parsed.path_segments().ok_or_else(invalid)?.collect();
    if segments.len() < 4 || segments[2] != "pull" {
        return Err(invalid());
    }

    let (owner, repo, number) = (segments[0], segments[1], segments[3]);
    if owner.is_empty() || repo.is_empty() {
        return Err(invalid());
    }
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let pr_number = number.parse::<u64>().map_err(|_| invalid())?;

    Ok(PrUrl {
        owner: owner.to_string(),
        repo: repo.to_string(),
        pr_number,
    })
}
