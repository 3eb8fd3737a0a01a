use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single commit with change statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub additions: u64,
    pub deletions: u64,
    pub files_changed: u64,
}

impl Commit {
    /// Lines added minus lines removed.
    pub fn net_changes(&self) -> i64 {
        self.additions as i64 - self.deletions as i64
    }

    /// Lines added plus lines removed.
    pub fn total_changes(&self) -> u64 {
        self.additions + self.deletions
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullState {
    Open,
    Closed,
    Merged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
}

/// A review submitted on a pull request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer: String,
    pub state: ReviewState,
    pub submitted_at: DateTime<Utc>,
    pub body: Option<String>,
}

/// A pull request with its change statistics and reviews.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub state: PullState,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub additions: u64,
    pub deletions: u64,
    pub commits: u64,
    pub reviews: Vec<Review>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.state == PullState::Merged && self.merged_at.is_some()
    }

    /// Hours from creation to merge, if merged.
    pub fn time_to_merge(&self) -> Option<f64> {
        self.merged_at
            .map(|merged| (merged - self.created_at).num_seconds() as f64 / 3600.0)
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }
}

/// An issue, excluding pull requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub state: IssueState,
    pub closed_at: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub body: Option<String>,
}

impl Issue {
    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed && self.closed_at.is_some()
    }

    /// Hours from creation to close, if closed.
    pub fn time_to_close(&self) -> Option<f64> {
        self.closed_at
            .map(|closed| (closed - self.created_at).num_seconds() as f64 / 3600.0)
    }
}
