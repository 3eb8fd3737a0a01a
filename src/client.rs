use std::fmt;
use std::time::Duration;

use chrono::Utc;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;

use crate::{
    cache::ResponseCache,
    decode,
    rate::{backoff_delay, reset_delay, RateLimit},
    wire, ClientOptions, Commit, CommitQuery, GitPulseError, Issue, PullRequest, Repo, RepoSummary,
    Result, StateFilter,
};

/// Default GitHub REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("gitpulse/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the GitHub REST API.
///
/// Every request goes through a rate-limit-aware retry loop: 429 (and 403
/// with an exhausted quota) sleeps until the advertised reset, 5xx and
/// transport failures back off exponentially, and authentication failures
/// surface immediately without a retry. Calls may therefore block for the
/// duration of backoff sleeps.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    options: ClientOptions,
    cache: ResponseCache,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl GitHubClient {
    /// Creates a client for the public GitHub API from a personal access
    /// token. A missing `Bearer ` prefix is added automatically.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Creates a client against a custom endpoint (GitHub Enterprise, or a
    /// mock server in tests).
    pub fn with_base_url(base_url: impl Into<String>, token: impl AsRef<str>) -> Self {
        let options = ClientOptions::default();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: normalize_bearer_authorization(token.as_ref()),
            cache: ResponseCache::new(Duration::from_millis(options.cache_ttl_ms)),
            options,
        }
    }

    /// Creates a client from the `GITHUB_TOKEN` environment variable.
    ///
    /// Returns an error if the variable is missing or empty.
    pub fn from_env() -> std::result::Result<Self, String> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| "missing GITHUB_TOKEN environment variable".to_owned())?;
        if token.trim().is_empty() {
            return Err("GITHUB_TOKEN is set but empty".to_owned());
        }
        Ok(Self::new(token))
    }

    /// Applies client options such as timeout, retry ceiling, and cache TTL.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.cache = ResponseCache::new(Duration::from_millis(opts.cache_ttl_ms));
        self.options = opts;
        self
    }

    /// Drops all cached responses. Call between report cycles.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Validates the credential and returns the authenticated login.
    pub async fn viewer(&self) -> Result<String> {
        let viewer: wire::Viewer = self.get("/user", &[]).await?;
        tracing::debug!(login = %viewer.login, "authenticated");
        Ok(viewer.login)
    }

    /// Validates access to a repository and returns its summary.
    pub async fn repository(&self, repo: &Repo) -> Result<RepoSummary> {
        let path = format!("/repos/{}/{}", repo.owner, repo.name);
        let info: wire::Repository = self.get(&path, &[]).await?;
        Ok(RepoSummary {
            full_name: info.full_name,
            default_branch: info.default_branch.unwrap_or_else(|| "main".to_owned()),
            private: info.private,
        })
    }

    /// Retrieves commit history with change statistics.
    ///
    /// The list endpoint carries no stats, so each commit costs a follow-up
    /// detail request. Commits whose detail payload fails to decode are
    /// logged and skipped.
    pub async fn commits(&self, repo: &Repo, query: &CommitQuery) -> Result<Vec<Commit>> {
        let path = format!("/repos/{}/{}/commits", repo.owner, repo.name);
        let mut commits = Vec::new();

        for page in self.pages(&path, query.to_query_pairs()).await? {
            let entries: Vec<wire::CommitSummary> = decode_page(&path, page)?;
            for entry in entries {
                match self.commit_detail(repo, &entry.sha).await {
                    Ok(commit) => commits.push(commit),
                    Err(err @ GitPulseError::Decode(_)) => {
                        tracing::warn!(sha = %entry.sha, error = %err, "skipping undecodable commit");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(commits)
    }

    /// Retrieves pull requests, including reviews, filtered by state.
    pub async fn pull_requests(&self, repo: &Repo, state: StateFilter) -> Result<Vec<PullRequest>> {
        let path = format!("/repos/{}/{}/pulls", repo.owner, repo.name);
        let query = vec![
            ("state".to_owned(), state.as_str().to_owned()),
            ("sort".to_owned(), "updated".to_owned()),
            ("direction".to_owned(), "desc".to_owned()),
        ];

        let mut pull_requests = Vec::new();
        for page in self.pages(&path, query).await? {
            let entries: Vec<wire::PullSummary> = decode_page(&path, page)?;
            for entry in entries {
                match self.pull_request_detail(repo, entry.number).await {
                    Ok(pr) => pull_requests.push(pr),
                    Err(err @ GitPulseError::Decode(_)) => {
                        tracing::warn!(number = entry.number, error = %err, "skipping undecodable pull request");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(pull_requests)
    }

    /// Retrieves issues filtered by state. Pull requests carried by the
    /// issues feed are skipped.
    pub async fn issues(&self, repo: &Repo, state: StateFilter) -> Result<Vec<Issue>> {
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let query = vec![
            ("state".to_owned(), state.as_str().to_owned()),
            ("sort".to_owned(), "updated".to_owned()),
            ("direction".to_owned(), "desc".to_owned()),
        ];

        let mut issues = Vec::new();
        for page in self.pages(&path, query).await? {
            let entries: Vec<wire::IssueEntry> = decode_page(&path, page)?;
            for entry in entries {
                let number = entry.number;
                match decode::decode_issue(entry) {
                    Ok(Some(issue)) => issues.push(issue),
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(number, error = %err, "skipping undecodable issue");
                    }
                }
            }
        }

        Ok(issues)
    }

    async fn commit_detail(&self, repo: &Repo, sha: &str) -> Result<Commit> {
        let path = format!("/repos/{}/{}/commits/{sha}", repo.owner, repo.name);
        let detail: wire::CommitDetail = self.get(&path, &[]).await?;
        decode::decode_commit(detail)
    }

    async fn pull_request_detail(&self, repo: &Repo, number: u64) -> Result<PullRequest> {
        let path = format!("/repos/{}/{}/pulls/{number}", repo.owner, repo.name);
        let detail: wire::PullDetail = self.get(&path, &[]).await?;

        let reviews_path = format!("{path}/reviews");
        let entries: Vec<wire::ReviewEntry> = self.get(&reviews_path, &[]).await?;

        let mut reviews = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(review) = decode::decode_review(entry)? {
                reviews.push(review);
            }
        }

        decode::decode_pull_request(detail, reviews)
    }

    /// Fetches every page of a list endpoint, starting at page 1 and
    /// stopping on an empty or short page.
    async fn pages(&self, path: &str, base_query: Vec<(String, String)>) -> Result<Vec<Value>> {
        let per_page = self.options.per_page;
        let mut pages = Vec::new();
        let mut page = 1u32;

        loop {
            let mut query = base_query.clone();
            query.push(("per_page".to_owned(), per_page.to_string()));
            query.push(("page".to_owned(), page.to_string()));

            let value = self.get_json(path, &query).await?;
            let len = value.as_array().map(Vec::len).ok_or_else(|| {
                GitPulseError::Decode(format!("expected a JSON array from {path}"))
            })?;

            if len == 0 {
                break;
            }
            pages.push(value);
            if (len as u32) < per_page {
                break;
            }
            page += 1;
        }

        Ok(pages)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let value = self.get_json(path, query).await?;
        serde_json::from_value(value)
            .map_err(|err| GitPulseError::Decode(format!("invalid payload from {path}: {err}")))
    }

    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let key = ResponseCache::key(path, query);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(%path, "response cache hit");
            return Ok(hit);
        }

        let value = self.get_with_retry(path, query).await?;
        self.cache.put(key, value.clone());
        Ok(value)
    }

    /// The retry loop. One successful page, or a typed error once the retry
    /// ceiling is exhausted.
    async fn get_with_retry(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let base = Duration::from_millis(self.options.retry_backoff_ms);
        let cap = Duration::from_millis(self.options.retry_cap_ms);
        let mut attempt = 0usize;

        loop {
            let response = self
                .http
                .get(&url)
                .header(header::AUTHORIZATION, &self.token)
                .header(header::ACCEPT, "application/vnd.github+json")
                .header(header::USER_AGENT, USER_AGENT)
                .timeout(Duration::from_millis(self.options.timeout_ms))
                .query(query)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    let rate = RateLimit::from_headers(response.headers());
                    let body = response.text().await.map_err(GitPulseError::Transport)?;

                    if status.is_success() {
                        return serde_json::from_str(&body).map_err(|err| {
                            GitPulseError::Decode(format!("invalid JSON from {path}: {err}"))
                        });
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        return Err(GitPulseError::Auth {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    if is_rate_limited(status, &rate, &body) {
                        if attempt < self.options.max_retries {
                            let delay = reset_delay(rate.reset_at, Utc::now(), attempt, base, cap);
                            tracing::warn!(
                                delay_ms = delay.as_millis() as u64,
                                "rate limited; waiting for quota reset"
                            );
                            sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(GitPulseError::RateLimited {
                            attempts: attempt + 1,
                            reset_at: rate.reset_at,
                        });
                    }

                    if status == StatusCode::FORBIDDEN {
                        return Err(GitPulseError::Auth {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    if status.is_server_error() {
                        if attempt < self.options.max_retries {
                            let delay = backoff_delay(attempt, base, cap);
                            tracing::warn!(
                                status = status.as_u16(),
                                delay_ms = delay.as_millis() as u64,
                                "server error; backing off"
                            );
                            sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(GitPulseError::Exhausted {
                            attempts: attempt + 1,
                            status: status.as_u16(),
                            body,
                        });
                    }

                    return Err(GitPulseError::Http {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) => {
                    if should_retry_transport(&err) && attempt < self.options.max_retries {
                        let delay = backoff_delay(attempt, base, cap);
                        tracing::warn!(
                            error = %err,
                            delay_ms = delay.as_millis() as u64,
                            "transport error; backing off"
                        );
                        sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(GitPulseError::Transport(err));
                }
            }
        }
    }
}

fn decode_page<T: DeserializeOwned>(path: &str, page: Value) -> Result<Vec<T>> {
    serde_json::from_value(page)
        .map_err(|err| GitPulseError::Decode(format!("invalid list payload from {path}: {err}")))
}

/// GitHub signals primary rate limiting as 429, or as 403 with an exhausted
/// quota header or a rate-limit message body.
fn is_rate_limited(status: StatusCode, rate: &RateLimit, body: &str) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (rate.is_exhausted() || body.to_ascii_lowercase().contains("rate limit")))
}

fn should_retry_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_body() || err.is_connect()
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::StatusCode;

    use super::{is_rate_limited, normalize_bearer_authorization, GitHubClient};
    use crate::rate::RateLimit;

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("ghp_abc123"),
            "Bearer ghp_abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR ghp_abc123"),
            "bEaReR ghp_abc123".to_owned()
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let client = GitHubClient::new("ghp_secret_token");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("ghp_secret_token"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GitHubClient::with_base_url("http://127.0.0.1:9/", "t");
        let debug = format!("{client:?}");
        assert!(debug.contains("http://127.0.0.1:9"));
        assert!(!debug.contains("http://127.0.0.1:9/"));
    }

    #[test]
    fn rate_limit_classification() {
        let empty = RateLimit::default();
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, &empty, ""));
        assert!(is_rate_limited(
            StatusCode::FORBIDDEN,
            &empty,
            "API rate limit exceeded for user"
        ));
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, &empty, "no access"));

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        let exhausted = RateLimit::from_headers(&headers);
        assert!(is_rate_limited(StatusCode::FORBIDDEN, &exhausted, ""));
    }
}
