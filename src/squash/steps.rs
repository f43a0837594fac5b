//! Progress lines reported while a squash runs.
//!
//! Every line exists twice: escaped HTML for the web page and plain text for
//! the terminal and the logs. Values that come from GitHub (titles, labels,
//! URLs) are escaped before they are interpolated into markup.

use crate::pr::{CompareResult, NewCommit, PrUrl, PullRequestSnapshot};

/// One line of the progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    html: String,
    plain: String,
}

impl Step {
    /// A line without markup; the HTML form is the escaped text.
    pub fn text(plain: impl Into<String>) -> Self {
        let plain = plain.into();
        Self {
            html: escape_html(&plain),
            plain,
        }
    }

    /// A line with links or code spans. `html` must already be escaped.
    fn markup(html: String, plain: String) -> Self {
        Self { html, plain }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn plain(&self) -> &str {
        &self.plain
    }
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Abbreviated commit id as shown by GitHub.
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

fn commit_url(web_host: &str, owner: &str, repo: &str, sha: &str) -> String {
    format!("https://{web_host}/{owner}/{repo}/commit/{sha}")
}

fn commit_link(url: &str, sha: &str) -> String {
    format!(
        "<a href=\"{}\"><code>{}</code></a>",
        escape_html(url),
        escape_html(short_sha(sha))
    )
}

pub fn announce(pr: &PrUrl) -> Step {
    Step::text(format!(
        "Will attempt to squash PR {} at {}/{}",
        pr.pr_number, pr.owner, pr.repo
    ))
}

pub fn pull_request(web_host: &str, pull: &PullRequestSnapshot) -> Step {
    let head = &pull.head;
    let head_url = commit_url(web_host, &head.repo_owner, &head.repo_name, &head.sha);
    let html = format!(
        "Pull request <a href=\"{}\">“{}”</a> wants to merge branch <code>{}</code> at commit {} into <code>{}</code>.",
        escape_html(&pull.html_url),
        escape_html(&pull.title),
        escape_html(&head.label),
        commit_link(&head_url, &head.sha),
        escape_html(&pull.base.label),
    );
    let plain = format!(
        "Pull request “{}” wants to merge branch {} at commit {} into {}.",
        pull.title,
        head.label,
        short_sha(&head.sha),
        pull.base.label
    );
    Step::markup(html, plain)
}

pub fn merge_base(web_host: &str, pull: &PullRequestSnapshot, compare: &CompareResult) -> Step {
    let base = &pull.base;
    let base_url = commit_url(
        web_host,
        &base.repo_owner,
        &base.repo_name,
        &compare.merge_base_sha,
    );
    let html = format!(
        "Branch contains {} commits on top of merge base {}.",
        compare.ahead_by,
        commit_link(&base_url, &compare.merge_base_sha)
    );
    let plain = format!(
        "Branch contains {} commits on top of merge base {}.",
        compare.ahead_by,
        short_sha(&compare.merge_base_sha)
    );
    Step::markup(html, plain)
}

pub fn head_tree(tree: &str) -> Step {
    Step::markup(
        format!(
            "The head commit refers to the tree object <code>{}</code>.",
            escape_html(short_sha(tree))
        ),
        format!(
            "The head commit refers to the tree object {}.",
            short_sha(tree)
        ),
    )
}

pub fn squashed(commit: &NewCommit) -> Step {
    Step::markup(
        format!(
            "Squashed to commit {}.",
            commit_link(&commit.html_url, &commit.sha)
        ),
        format!("Squashed to commit {}.", short_sha(&commit.sha)),
    )
}

pub fn branch_updated(head_label: &str) -> Step {
    Step::markup(
        format!(
            "Successfully updated <code>{}</code>.",
            escape_html(head_label)
        ),
        format!("Successfully updated {head_label}."),
    )
}

/// Reported when the ref update fails after the commit object was created.
pub fn orphaned(commit: &NewCommit) -> Step {
    Step::markup(
        format!(
            "Commit {} was created but no branch points at it.",
            commit_link(&commit.html_url, &commit.sha)
        ),
        format!(
            "Commit {} was created but no branch points at it.",
            short_sha(&commit.sha)
        ),
    )
}

pub fn failure(reason: &impl std::fmt::Display) -> Step {
    Step::text(format!("Failure: {reason}"))
}
