use chrono::{Duration, Utc};
use gitpulse::{metrics, CommitQuery, GitHubClient, InsightAnalyzer, Repo, StateFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = GitHubClient::from_env().map_err(anyhow::Error::msg)?;
    let analyzer = InsightAnalyzer::from_env().map_err(anyhow::Error::msg)?;
    let repo = Repo::from_full_name(
        &std::env::var("GITPULSE_REPO").unwrap_or_else(|_| "octocat/hello-world".to_owned()),
    )?;

    let period_end = Utc::now();
    let period_start = period_end - Duration::days(30);

    let commits = client
        .commits(&repo, &CommitQuery::default().since(period_start))
        .await?;
    let pulls = client.pull_requests(&repo, StateFilter::All).await?;
    let issues = client.issues(&repo, StateFilter::All).await?;

    let report = metrics::productivity_report(&commits, &pulls, &issues, period_start, period_end);

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "How did this month compare to a typical month?".to_owned());
    let answer = analyzer.ask(&question, &report).await?;
    println!("{answer}");

    Ok(())
}
