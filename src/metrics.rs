//! Aggregate productivity metrics computed from fetched activity.
//!
//! Everything here is arithmetic over already-decoded data: counts, sums,
//! averages, and simple time bucketing. All output types serialize with
//! serde so the export layer can pass them through unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{Commit, Issue, PullRequest, PullState, ReviewState};

/// Time bucket width for the velocity series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    /// Approximated as 30 days.
    Monthly,
    /// Approximated as 90 days.
    Quarterly,
}

impl Period {
    fn span(self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::weeks(1),
            Self::Monthly => Duration::days(30),
            Self::Quarterly => Duration::days(90),
        }
    }
}

/// Commit counts keyed by calendar bucket.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFrequency {
    /// `YYYY-MM-DD` → count.
    pub daily: BTreeMap<String, u64>,
    /// ISO week `YYYY-Www` → count.
    pub weekly: BTreeMap<String, u64>,
    /// `YYYY-MM` → count.
    pub monthly: BTreeMap<String, u64>,
    /// Hour of day `0`..`23` → count.
    pub hourly: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitMetrics {
    pub total_commits: u64,
    pub frequency: CommitFrequency,
    pub average_additions: f64,
    pub average_deletions: f64,
    pub average_files_changed: f64,
    /// Up to three hours of day with the most commits, busiest first.
    pub most_active_hours: Vec<u32>,
    pub average_message_length: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PullMetrics {
    pub total_prs: u64,
    pub merged_prs: u64,
    pub closed_prs: u64,
    pub open_prs: u64,
    /// Hours, averaged over merged PRs. `None` when nothing merged.
    pub average_time_to_merge: Option<f64>,
    pub average_additions: f64,
    pub average_deletions: f64,
    pub average_commits_per_pr: f64,
    /// Percentage of PRs that merged.
    pub merge_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetrics {
    pub total_reviews_given: u64,
    pub total_reviews_received: u64,
    /// Hours from PR creation to its first review, averaged. `None` when no
    /// PR has a review.
    pub average_review_time: Option<f64>,
    pub approval_rate: f64,
    pub change_request_rate: f64,
    /// Percentage of PRs with at least one review.
    pub review_participation_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueMetrics {
    pub total_issues: u64,
    pub closed_issues: u64,
    pub open_issues: u64,
    /// Hours, averaged over closed issues.
    pub average_time_to_close: Option<f64>,
    pub resolution_rate: f64,
    pub issues_created: u64,
    pub issues_assigned: u64,
}

/// One bucket of the activity time series.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityPoint {
    pub timestamp: DateTime<Utc>,
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
    pub pull_requests: u64,
    pub issues_closed: u64,
}

impl VelocityPoint {
    pub fn total_changes(&self) -> u64 {
        self.additions + self.deletions
    }
}

/// Everything the export and analysis layers consume for one period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductivityReport {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub commit_metrics: CommitMetrics,
    pub pull_metrics: PullMetrics,
    pub review_metrics: ReviewMetrics,
    pub issue_metrics: IssueMetrics,
    pub velocity: Vec<VelocityPoint>,
    /// Estimated share of time per activity kind, in percent.
    pub time_distribution: BTreeMap<String, f64>,
}

impl ProductivityReport {
    pub fn period_days(&self) -> i64 {
        (self.period_end - self.period_start).num_days()
    }

    pub fn daily_commit_average(&self) -> f64 {
        let days = self.period_days();
        if days == 0 {
            return 0.0;
        }
        self.commit_metrics.total_commits as f64 / days as f64
    }
}

/// Computes commit activity metrics. Empty input yields zeroed metrics.
pub fn commit_metrics(commits: &[Commit]) -> CommitMetrics {
    if commits.is_empty() {
        return CommitMetrics::default();
    }

    let total = commits.len() as u64;
    let mut frequency = CommitFrequency::default();
    let mut hour_counts = [0u64; 24];

    for commit in commits {
        let ts = commit.timestamp;
        *frequency
            .daily
            .entry(ts.format("%Y-%m-%d").to_string())
            .or_default() += 1;
        let week = ts.iso_week();
        *frequency
            .weekly
            .entry(format!("{}-W{:02}", week.year(), week.week()))
            .or_default() += 1;
        *frequency
            .monthly
            .entry(ts.format("%Y-%m").to_string())
            .or_default() += 1;
        *frequency.hourly.entry(ts.hour().to_string()).or_default() += 1;
        hour_counts[ts.hour() as usize] += 1;
    }

    let sum_additions: u64 = commits.iter().map(|c| c.additions).sum();
    let sum_deletions: u64 = commits.iter().map(|c| c.deletions).sum();
    let sum_files: u64 = commits.iter().map(|c| c.files_changed).sum();
    let sum_message_len: u64 = commits.iter().map(|c| c.message.len() as u64).sum();

    CommitMetrics {
        total_commits: total,
        frequency,
        average_additions: sum_additions as f64 / total as f64,
        average_deletions: sum_deletions as f64 / total as f64,
        average_files_changed: sum_files as f64 / total as f64,
        most_active_hours: most_active_hours(&hour_counts, 3),
        average_message_length: sum_message_len as f64 / total as f64,
    }
}

/// Busiest hours of day, ties broken toward the earlier hour.
fn most_active_hours(hour_counts: &[u64; 24], top_n: usize) -> Vec<u32> {
    let mut hours: Vec<(u32, u64)> = hour_counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(hour, count)| (hour as u32, *count))
        .collect();
    hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    hours.into_iter().take(top_n).map(|(hour, _)| hour).collect()
}

/// Computes pull request metrics. Empty input yields zeroed metrics.
pub fn pull_metrics(pull_requests: &[PullRequest]) -> PullMetrics {
    if pull_requests.is_empty() {
        return PullMetrics::default();
    }

    let total = pull_requests.len() as u64;
    let merged = pull_requests.iter().filter(|pr| pr.is_merged()).count() as u64;
    let closed = pull_requests
        .iter()
        .filter(|pr| pr.state == PullState::Closed && !pr.is_merged())
        .count() as u64;
    let open = pull_requests
        .iter()
        .filter(|pr| pr.state == PullState::Open)
        .count() as u64;

    let merge_times: Vec<f64> = pull_requests
        .iter()
        .filter_map(PullRequest::time_to_merge)
        .collect();

    let sum_additions: u64 = pull_requests.iter().map(|pr| pr.additions).sum();
    let sum_deletions: u64 = pull_requests.iter().map(|pr| pr.deletions).sum();
    let sum_commits: u64 = pull_requests.iter().map(|pr| pr.commits).sum();

    PullMetrics {
        total_prs: total,
        merged_prs: merged,
        closed_prs: closed,
        open_prs: open,
        average_time_to_merge: mean(&merge_times),
        average_additions: sum_additions as f64 / total as f64,
        average_deletions: sum_deletions as f64 / total as f64,
        average_commits_per_pr: sum_commits as f64 / total as f64,
        merge_rate: percentage(merged, total),
    }
}

/// Computes review participation metrics.
///
/// With a `target_author`, "given" counts that author's reviews on any PR and
/// "received" counts reviews on that author's PRs; without one, both cover
/// every review.
pub fn review_metrics(pull_requests: &[PullRequest], target_author: Option<&str>) -> ReviewMetrics {
    if pull_requests.is_empty() {
        return ReviewMetrics::default();
    }

    let mut given = Vec::new();
    let mut received = 0u64;
    for pr in pull_requests {
        match target_author {
            Some(author) => {
                given.extend(pr.reviews.iter().filter(|r| r.reviewer == author));
                if pr.author == author {
                    received += pr.reviews.len() as u64;
                }
            }
            None => {
                given.extend(pr.reviews.iter());
                received += pr.reviews.len() as u64;
            }
        }
    }

    let review_times: Vec<f64> = pull_requests
        .iter()
        .filter_map(|pr| {
            pr.reviews
                .iter()
                .map(|r| r.submitted_at)
                .min()
                .map(|first| (first - pr.created_at).num_seconds() as f64 / 3600.0)
        })
        .collect();

    let approved = given
        .iter()
        .filter(|r| r.state == ReviewState::Approved)
        .count() as u64;
    let changes_requested = given
        .iter()
        .filter(|r| r.state == ReviewState::ChangesRequested)
        .count() as u64;

    let reviewed_prs = match target_author {
        Some(author) => pull_requests
            .iter()
            .filter(|pr| pr.reviews.iter().any(|r| r.reviewer == author))
            .count(),
        None => pull_requests
            .iter()
            .filter(|pr| !pr.reviews.is_empty())
            .count(),
    } as u64;

    ReviewMetrics {
        total_reviews_given: given.len() as u64,
        total_reviews_received: received,
        average_review_time: mean(&review_times),
        approval_rate: percentage(approved, given.len() as u64),
        change_request_rate: percentage(changes_requested, given.len() as u64),
        review_participation_rate: percentage(reviewed_prs, pull_requests.len() as u64),
    }
}

/// Computes issue resolution metrics, optionally scoped to one author.
pub fn issue_metrics(issues: &[Issue], target_author: Option<&str>) -> IssueMetrics {
    if issues.is_empty() {
        return IssueMetrics::default();
    }

    let total = issues.len() as u64;
    let closed = issues.iter().filter(|issue| issue.is_closed()).count() as u64;

    let close_times: Vec<f64> = issues.iter().filter_map(Issue::time_to_close).collect();

    let created = match target_author {
        Some(author) => issues.iter().filter(|issue| issue.author == author).count(),
        None => issues.len(),
    } as u64;
    let assigned = match target_author {
        Some(author) => issues
            .iter()
            .filter(|issue| issue.assignee.as_deref() == Some(author))
            .count(),
        None => issues.iter().filter(|issue| issue.assignee.is_some()).count(),
    } as u64;

    IssueMetrics {
        total_issues: total,
        closed_issues: closed,
        open_issues: total - closed,
        average_time_to_close: mean(&close_times),
        resolution_rate: percentage(closed, total),
        issues_created: created,
        issues_assigned: assigned,
    }
}

/// Buckets activity into a time series over the observed date range.
///
/// Buckets start at midnight of the earliest activity and step by the period
/// span; each point counts commits and their line changes, PRs created, and
/// issues closed inside the bucket.
pub fn velocity_series(
    commits: &[Commit],
    pull_requests: &[PullRequest],
    issues: &[Issue],
    period: Period,
) -> Vec<VelocityPoint> {
    let mut dates: Vec<DateTime<Utc>> = Vec::new();
    dates.extend(commits.iter().map(|c| c.timestamp));
    dates.extend(pull_requests.iter().map(|pr| pr.created_at));
    dates.extend(issues.iter().map(|issue| issue.created_at));
    dates.extend(issues.iter().filter_map(|issue| issue.closed_at));

    let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) else {
        return Vec::new();
    };

    let start = first
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(*first);
    let span = period.span();

    let mut points = Vec::new();
    let mut bucket_start = start;
    while bucket_start <= *last {
        let bucket_end = bucket_start + span;
        let in_bucket = |ts: DateTime<Utc>| ts >= bucket_start && ts < bucket_end;

        let bucket_commits: Vec<&Commit> =
            commits.iter().filter(|c| in_bucket(c.timestamp)).collect();

        points.push(VelocityPoint {
            timestamp: bucket_start,
            commits: bucket_commits.len() as u64,
            additions: bucket_commits.iter().map(|c| c.additions).sum(),
            deletions: bucket_commits.iter().map(|c| c.deletions).sum(),
            pull_requests: pull_requests
                .iter()
                .filter(|pr| in_bucket(pr.created_at))
                .count() as u64,
            issues_closed: issues
                .iter()
                .filter(|issue| issue.closed_at.is_some_and(in_bucket))
                .count() as u64,
        });

        bucket_start = bucket_end;
    }

    points
}

/// Assembles the full report for one analysis period.
pub fn productivity_report(
    commits: &[Commit],
    pull_requests: &[PullRequest],
    issues: &[Issue],
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> ProductivityReport {
    ProductivityReport {
        period_start,
        period_end,
        commit_metrics: commit_metrics(commits),
        pull_metrics: pull_metrics(pull_requests),
        review_metrics: review_metrics(pull_requests, None),
        issue_metrics: issue_metrics(issues, None),
        velocity: velocity_series(commits, pull_requests, issues, Period::Daily),
        time_distribution: time_distribution(commits.len(), pull_requests.len()),
    }
}

/// Rough time split across activity kinds, estimated from activity counts
/// (half an hour per commit, two hours per PR).
fn time_distribution(commit_count: usize, pr_count: usize) -> BTreeMap<String, f64> {
    let coding_hours = commit_count as f64 * 0.5;
    let review_hours = pr_count as f64 * 2.0;
    let total = coding_hours + review_hours;

    let mut distribution = BTreeMap::new();
    if total == 0.0 {
        return distribution;
    }
    distribution.insert("coding".to_owned(), coding_hours / total * 100.0);
    distribution.insert("code_review".to_owned(), review_hours / total * 100.0);
    distribution.insert("other".to_owned(), 0.0);
    distribution
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{
        commit_metrics, issue_metrics, productivity_report, pull_metrics, review_metrics,
        velocity_series, Period,
    };
    use crate::{Commit, Issue, IssueState, PullRequest, PullState, Review, ReviewState};

    fn ts(day: u32, hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn commit(day: u32, hour: u32, additions: u64, deletions: u64) -> Commit {
        Commit {
            sha: format!("sha-{day}-{hour}"),
            author: "kit".to_owned(),
            timestamp: ts(day, hour),
            message: "update".to_owned(),
            additions,
            deletions,
            files_changed: 2,
        }
    }

    fn review(reviewer: &str, state: ReviewState, at: chrono::DateTime<Utc>) -> Review {
        Review {
            reviewer: reviewer.to_owned(),
            state,
            submitted_at: at,
            body: None,
        }
    }

    fn pr(
        number: u64,
        author: &str,
        state: PullState,
        merged_after_hours: Option<i64>,
        reviews: Vec<Review>,
    ) -> PullRequest {
        let created = ts(1, 9);
        PullRequest {
            number,
            title: format!("pr {number}"),
            author: author.to_owned(),
            created_at: created,
            state,
            merged_at: merged_after_hours.map(|h| created + Duration::hours(h)),
            closed_at: merged_after_hours.map(|h| created + Duration::hours(h)),
            additions: 100,
            deletions: 20,
            commits: 4,
            reviews,
        }
    }

    #[test]
    fn empty_inputs_yield_zeroed_metrics() {
        assert_eq!(commit_metrics(&[]).total_commits, 0);
        assert_eq!(pull_metrics(&[]).merge_rate, 0.0);
        assert_eq!(review_metrics(&[], None).total_reviews_given, 0);
        assert_eq!(issue_metrics(&[], None).resolution_rate, 0.0);
        assert!(velocity_series(&[], &[], &[], Period::Daily).is_empty());
    }

    #[test]
    fn commit_averages_and_frequency() {
        let commits = vec![commit(1, 9, 10, 2), commit(1, 9, 30, 8), commit(2, 14, 20, 5)];
        let metrics = commit_metrics(&commits);

        assert_eq!(metrics.total_commits, 3);
        assert_eq!(metrics.average_additions, 20.0);
        assert_eq!(metrics.average_deletions, 5.0);
        assert_eq!(metrics.frequency.daily.get("2024-03-01"), Some(&2));
        assert_eq!(metrics.frequency.daily.get("2024-03-02"), Some(&1));
        assert_eq!(metrics.frequency.monthly.get("2024-03"), Some(&3));
        assert_eq!(metrics.frequency.hourly.get("9"), Some(&2));
        assert_eq!(metrics.most_active_hours, vec![9, 14]);
    }

    #[test]
    fn pull_metrics_state_split_and_merge_rate() {
        let prs = vec![
            pr(1, "kit", PullState::Merged, Some(6), vec![]),
            pr(2, "kit", PullState::Merged, Some(18), vec![]),
            pr(3, "kit", PullState::Closed, None, vec![]),
            pr(4, "kit", PullState::Open, None, vec![]),
        ];
        let metrics = pull_metrics(&prs);

        assert_eq!(metrics.total_prs, 4);
        assert_eq!(metrics.merged_prs, 2);
        assert_eq!(metrics.closed_prs, 1);
        assert_eq!(metrics.open_prs, 1);
        assert_eq!(metrics.merge_rate, 50.0);
        assert_eq!(metrics.average_time_to_merge, Some(12.0));
        assert_eq!(metrics.average_commits_per_pr, 4.0);
    }

    #[test]
    fn review_metrics_scoped_to_author() {
        let first = ts(1, 12);
        let prs = vec![
            pr(
                1,
                "kit",
                PullState::Open,
                None,
                vec![review("ana", ReviewState::Approved, first)],
            ),
            pr(
                2,
                "ana",
                PullState::Open,
                None,
                vec![
                    review("kit", ReviewState::ChangesRequested, first),
                    review("kit", ReviewState::Approved, first + Duration::hours(4)),
                ],
            ),
            pr(3, "ana", PullState::Open, None, vec![]),
        ];

        let metrics = review_metrics(&prs, Some("kit"));
        assert_eq!(metrics.total_reviews_given, 2);
        assert_eq!(metrics.total_reviews_received, 1);
        assert_eq!(metrics.approval_rate, 50.0);
        assert_eq!(metrics.change_request_rate, 50.0);
        // kit reviewed one of three PRs.
        assert!((metrics.review_participation_rate - 100.0 / 3.0).abs() < 1e-9);

        let overall = review_metrics(&prs, None);
        assert_eq!(overall.total_reviews_given, 3);
        assert_eq!(overall.average_review_time, Some(3.0));
        assert!((overall.review_participation_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn issue_metrics_resolution() {
        let issues = vec![
            Issue {
                number: 1,
                title: "a".to_owned(),
                author: "kit".to_owned(),
                created_at: ts(1, 9),
                state: IssueState::Closed,
                closed_at: Some(ts(2, 9)),
                assignee: Some("ana".to_owned()),
                labels: vec![],
                body: None,
            },
            Issue {
                number: 2,
                title: "b".to_owned(),
                author: "ana".to_owned(),
                created_at: ts(1, 9),
                state: IssueState::Open,
                closed_at: None,
                assignee: None,
                labels: vec![],
                body: None,
            },
        ];

        let metrics = issue_metrics(&issues, None);
        assert_eq!(metrics.total_issues, 2);
        assert_eq!(metrics.closed_issues, 1);
        assert_eq!(metrics.open_issues, 1);
        assert_eq!(metrics.resolution_rate, 50.0);
        assert_eq!(metrics.average_time_to_close, Some(24.0));

        let scoped = issue_metrics(&issues, Some("ana"));
        assert_eq!(scoped.issues_created, 1);
        assert_eq!(scoped.issues_assigned, 1);
    }

    #[test]
    fn velocity_series_buckets_by_day() {
        let commits = vec![commit(1, 9, 10, 2), commit(1, 17, 5, 1), commit(3, 9, 7, 0)];
        let prs = vec![pr(1, "kit", PullState::Open, None, vec![])];
        let issues = vec![Issue {
            number: 1,
            title: "a".to_owned(),
            author: "kit".to_owned(),
            created_at: ts(1, 9),
            state: IssueState::Closed,
            closed_at: Some(ts(2, 12)),
            assignee: None,
            labels: vec![],
            body: None,
        }];

        let series = velocity_series(&commits, &prs, &issues, Period::Daily);
        assert_eq!(series.len(), 3);

        assert_eq!(series[0].commits, 2);
        assert_eq!(series[0].additions, 15);
        assert_eq!(series[0].pull_requests, 1);
        assert_eq!(series[0].issues_closed, 0);

        assert_eq!(series[1].commits, 0);
        assert_eq!(series[1].issues_closed, 1);

        assert_eq!(series[2].commits, 1);
        assert_eq!(series[2].total_changes(), 7);
    }

    #[test]
    fn report_daily_commit_average() {
        let commits = vec![commit(1, 9, 1, 0), commit(2, 9, 1, 0)];
        let report = productivity_report(&commits, &[], &[], ts(1, 0), ts(5, 0));

        assert_eq!(report.period_days(), 4);
        assert_eq!(report.daily_commit_average(), 0.5);
        assert_eq!(report.time_distribution.get("coding"), Some(&100.0));
    }
}
