use chrono::{Duration, Utc};
use gitpulse::{export, metrics, CommitQuery, GitHubClient, Repo, StateFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = GitHubClient::from_env().map_err(anyhow::Error::msg)?;
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

    println!("{}", export::metrics_csv(&report));
    println!("{}", export::velocity_csv(&report));

    Ok(())
}
