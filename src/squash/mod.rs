pub mod steps;

pub use steps::Step;

use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

use crate::github::{ApiError, GitHubApi};
use crate::pr::{self, CommitRequest, Committer, NewCommit, PrError};

#[derive(Debug, Error)]
pub enum SquashError {
    #[error(transparent)]
    InvalidInput(#[from] PrError),

    /// Head branch has no commits beyond the merge base. Carries the compare URL.
    #[error("Branch does not seem to contain new commits: {0}")]
    NothingToSquash(String),

    /// GitHub rejected the access token.
    #[error(transparent)]
    UpstreamAuthFailure(ApiError),

    #[error(transparent)]
    UpstreamApiFailure(ApiError),
}

impl From<ApiError> for SquashError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized { .. } => SquashError::UpstreamAuthFailure(error),
            other => SquashError::UpstreamApiFailure(other),
        }
    }
}

/// Deployment-specific inputs to a squash.
#[derive(Debug, Clone)]
pub struct SquashSettings {
    /// Host of the GitHub web UI (pull request URLs and commit links)
    pub web_host: String,
    /// Committer recorded on the squashed commit
    pub committer: Committer,
}

/// Result of one orchestration run. `steps` is complete whatever the outcome:
/// it ends in "All done!" or in a "Failure: ..." line.
#[derive(Debug)]
pub struct SquashOutcome {
    pub steps: Vec<Step>,
    pub result: Result<NewCommit, SquashError>,
}

impl SquashOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Squash a pull request into one commit and force-push it onto its head branch.
///
/// Runs strictly in order, stopping at the first failure:
/// 1. parse the URL
/// 2. fetch the pull request
/// 3. compare base and head to find the merge base (no new commits: stop)
/// 4. read the head commit's tree
/// 5. create a commit with that tree and the merge base as its only parent
/// 6. force the head branch to the new commit
///
/// Nothing is retried or rolled back. If step 6 fails the commit from step 5
/// stays behind unreferenced and a step says so.
pub async fn squash<A>(api: &A, pull_url: &str, settings: &SquashSettings) -> SquashOutcome
where
    A: GitHubApi + ?Sized,
{
    let mut steps = Vec::new();
    let span = info_span!("squash", pull_url = %pull_url);
    let result = run(api, pull_url, settings, &mut steps)
        .instrument(span.clone())
        .await;

    let _entered = span.enter();
    match &result {
        Ok(commit) => {
            info!(sha = %commit.sha, "squash complete");
            steps.push(Step::text("All done!"));
        }
        Err(error) => {
            warn!(error = %error, completed_steps = steps.len(), "squash aborted");
            steps.push(steps::failure(error));
        }
    }

    SquashOutcome { steps, result }
}

fn record(steps: &mut Vec<Step>, step: Step) {
    info!("{}", step.plain());
    steps.push(step);
}

async fn run<A>(
    api: &A,
    pull_url: &str,
    settings: &SquashSettings,
    steps: &mut Vec<Step>,
) -> Result<NewCommit, SquashError>
where
    A: GitHubApi + ?Sized,
{
    let pr = pr::parse_pr_url(pull_url, &settings.web_host)?;
    record(steps, steps::announce(&pr));

    record(steps, Step::text("Getting PR information…"));
    let pull = api.get_pull_request(&pr).await?;
    record(steps, steps::pull_request(&settings.web_host, &pull));

    let head = &pull.head;
    let (owner, repo) = (head.repo_owner.as_str(), head.repo_name.as_str());

    record(steps, Step::text("Finding merge base…"));
    let compare = api
        .compare(owner, repo, &pull.base.label, &head.label)
        .await?;
    if compare.ahead_by == 0 {
        return Err(SquashError::NothingToSquash(compare.url));
    }
    record(steps, steps::merge_base(&settings.web_host, &pull, &compare));

    record(steps, Step::text("Fetching commit content…"));
    let tree = api.get_commit_tree(owner, repo, &head.sha).await?;
    record(steps, steps::head_tree(&tree));

    record(steps, Step::text("Creating squashed commit…"));
    let request = CommitRequest {
        message: pull.squash_message(),
        tree,
        parents: vec![compare.merge_base_sha.clone()],
        committer: settings.committer.clone(),
    };
    let commit = api.create_commit(owner, repo, &request).await?;
    record(steps, steps::squashed(&commit));

    record(steps, Step::text("Force pushing head branch…"));
    if let Err(error) = api
        .update_ref(owner, repo, &head.git_ref, &commit.sha, true)
        .await
    {
        record(steps, steps::orphaned(&commit));
        return Err(error.into());
    }
    record(steps, steps::branch_updated(&head.label));

    Ok(commit)
}
