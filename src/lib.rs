//! `gitpulse` is an async client for GitHub repository activity metrics.
//!
//! The crate wraps the GitHub REST API with a rate-limit-aware retrying
//! fetch layer and builds on it:
//! - [`GitHubClient::commits`], [`GitHubClient::pull_requests`],
//!   [`GitHubClient::issues`] — paginated activity fetching
//! - [`metrics::productivity_report`] — aggregate productivity metrics
//! - [`InsightAnalyzer::analyze`] — natural-language analysis via a chat
//!   completion endpoint
//! - [`export`] — CSV/JSON/HTML/text report serialization

mod analyzer;
mod cache;
mod client;
mod decode;
mod error;
mod options;
mod rate;
mod repo;
mod types;
mod wire;

pub mod export;
pub mod metrics;

pub use analyzer::{
    AnalysisReport, AnalyzerOptions, Anomaly, InsightAnalyzer, Severity, DEFAULT_COMPLETION_URL,
};
pub use cache::ResponseCache;
pub use client::{GitHubClient, DEFAULT_BASE_URL};
pub use error::GitPulseError;
pub use metrics::{
    CommitFrequency, CommitMetrics, IssueMetrics, Period, ProductivityReport, PullMetrics,
    ReviewMetrics, VelocityPoint,
};
pub use options::ClientOptions;
pub use rate::RateLimit;
pub use repo::{CommitQuery, Repo, RepoSummary, StateFilter};
pub use types::{Commit, Issue, IssueState, PullRequest, PullState, Review, ReviewState};

pub type Result<T> = std::result::Result<T, GitPulseError>;
