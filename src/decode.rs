use chrono::{DateTime, Utc};

use crate::{
    wire, Commit, GitPulseError, Issue, IssueState, PullRequest, PullState, Review, ReviewState,
};

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, GitPulseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| GitPulseError::Decode(format!("invalid {field} timestamp '{value}': {err}")))
}

fn parse_optional_timestamp(
    field: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, GitPulseError> {
    value.map(|value| parse_timestamp(field, value)).transpose()
}

pub(crate) fn decode_commit(detail: wire::CommitDetail) -> Result<Commit, GitPulseError> {
    if detail.sha.is_empty() {
        return Err(GitPulseError::Decode("commit sha cannot be empty".to_owned()));
    }

    let timestamp = parse_timestamp("commit author.date", &detail.commit.author.date)?;
    let stats = detail.stats.unwrap_or_default();
    let files_changed = detail.files.map(|files| files.len() as u64).unwrap_or(0);

    Ok(Commit {
        sha: detail.sha,
        author: detail.commit.author.name,
        timestamp,
        message: detail.commit.message,
        additions: stats.additions,
        deletions: stats.deletions,
        files_changed,
    })
}

pub(crate) fn decode_pull_request(
    detail: wire::PullDetail,
    reviews: Vec<Review>,
) -> Result<PullRequest, GitPulseError> {
    let created_at = parse_timestamp("pull created_at", &detail.created_at)?;
    let merged_at = parse_optional_timestamp("pull merged_at", detail.merged_at.as_deref())?;
    let closed_at = parse_optional_timestamp("pull closed_at", detail.closed_at.as_deref())?;

    // Merged PRs report state "closed"; merged_at is the discriminator.
    let state = if merged_at.is_some() {
        PullState::Merged
    } else {
        match detail.state.as_str() {
            "open" => PullState::Open,
            "closed" => PullState::Closed,
            other => {
                return Err(GitPulseError::Decode(format!(
                    "unknown pull request state '{other}' on #{}",
                    detail.number
                )))
            }
        }
    };

    Ok(PullRequest {
        number: detail.number,
        title: detail.title,
        author: detail.user.login,
        created_at,
        state,
        merged_at,
        closed_at,
        additions: detail.additions,
        deletions: detail.deletions,
        commits: detail.commits,
        reviews,
    })
}

/// Decodes a submitted review. Returns `Ok(None)` for pending reviews, which
/// carry no submission time and do not count toward metrics.
pub(crate) fn decode_review(entry: wire::ReviewEntry) -> Result<Option<Review>, GitPulseError> {
    let Some(submitted_at) = entry.submitted_at.as_deref() else {
        return Ok(None);
    };

    let state = match entry.state.as_str() {
        "APPROVED" => ReviewState::Approved,
        "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
        "COMMENTED" => ReviewState::Commented,
        // DISMISSED and other states carry no review signal.
        _ => return Ok(None),
    };

    Ok(Some(Review {
        reviewer: entry.user.login,
        state,
        submitted_at: parse_timestamp("review submitted_at", submitted_at)?,
        body: entry.body,
    }))
}

/// Decodes an issues-feed entry. Returns `Ok(None)` for pull requests, which
/// the feed includes under a `pull_request` key.
pub(crate) fn decode_issue(entry: wire::IssueEntry) -> Result<Option<Issue>, GitPulseError> {
    if entry.pull_request.is_some() {
        return Ok(None);
    }

    let state = match entry.state.as_str() {
        "open" => IssueState::Open,
        "closed" => IssueState::Closed,
        other => {
            return Err(GitPulseError::Decode(format!(
                "unknown issue state '{other}' on #{}",
                entry.number
            )))
        }
    };

    Ok(Some(Issue {
        number: entry.number,
        title: entry.title,
        author: entry.user.login,
        created_at: parse_timestamp("issue created_at", &entry.created_at)?,
        state,
        closed_at: parse_optional_timestamp("issue closed_at", entry.closed_at.as_deref())?,
        assignee: entry.assignee.map(|account| account.login),
        labels: entry.labels.into_iter().map(|label| label.name).collect(),
        body: entry.body,
    }))
}
