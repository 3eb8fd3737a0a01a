//! Natural-language analysis of productivity metrics through an
//! OpenAI-compatible chat completion endpoint.
//!
//! This layer formats prompts, passes the completion response through, and
//! parses it into a typed report. Failures always propagate; callers that
//! want a degraded answer opt into [`AnalysisReport::fallback`].

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::{
    rate::backoff_delay,
    wire::{ChatMessage, CompletionRequest, CompletionResponse, ResponseFormat},
    GitPulseError, ProductivityReport, Result,
};

/// Default OpenAI-compatible completion endpoint.
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a senior software engineering productivity analyst \
with expertise in GitHub metrics and developer performance analysis.";

/// Configures the completion endpoint and retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerOptions {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds. Completion endpoints advertise no
    /// reset time, so rate limits use the exponential path with this base.
    pub retry_backoff_ms: u64,
    /// Upper bound on any single retry sleep in milliseconds.
    pub retry_cap_ms: u64,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_COMPLETION_URL.to_owned(),
            model: "gpt-4o-mini".to_owned(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout_ms: 60_000,
            max_retries: 3,
            retry_backoff_ms: 5_000,
            retry_cap_ms: 60_000,
        }
    }
}

/// Severity of a detected anomaly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// An unusual pattern flagged by the analysis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub metric_name: String,
    pub description: String,
    pub severity: Severity,
}

/// Analysis of one productivity report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub key_insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub anomalies: Vec<Anomaly>,
    /// Always within `[0, 1]`.
    pub confidence_score: f64,
}

impl AnalysisReport {
    /// Deterministic rule-based report for when the completion call failed
    /// or no credential is configured. Reduced confidence.
    pub fn fallback(report: &ProductivityReport) -> Self {
        let mut insights = Vec::new();
        let mut recommendations = Vec::new();

        if report.commit_metrics.total_commits > 0 {
            let daily = report.daily_commit_average();
            if daily >= 2.0 {
                insights.push("High commit frequency indicates active development".to_owned());
            } else if daily >= 1.0 {
                insights.push("Moderate commit frequency shows steady progress".to_owned());
            } else {
                insights.push(
                    "Low commit frequency may indicate larger, less frequent changes".to_owned(),
                );
                recommendations.push("Consider making more frequent, smaller commits".to_owned());
            }
        }

        if report.pull_metrics.total_prs > 0 {
            let merge_rate = report.pull_metrics.merge_rate;
            if merge_rate >= 80.0 {
                insights.push("High pull request merge rate indicates good code quality".to_owned());
            } else if merge_rate >= 60.0 {
                insights.push(
                    "Moderate pull request merge rate with room for improvement".to_owned(),
                );
            } else {
                insights.push("Low pull request merge rate may indicate quality issues".to_owned());
                recommendations
                    .push("Focus on improving code quality before submission".to_owned());
            }
        }

        if report.review_metrics.total_reviews_given > 0 {
            insights
                .push("Active participation in code reviews shows good collaboration".to_owned());
        } else {
            recommendations.push("Consider participating more in code reviews".to_owned());
        }

        if insights.is_empty() {
            insights.push("Analysis data available for review".to_owned());
        }
        if recommendations.is_empty() {
            recommendations.push("Continue current development practices".to_owned());
        }

        Self {
            generated_at: Utc::now(),
            summary: format!(
                "Basic analysis for a {} day period with {} commits and {} pull requests.",
                report.period_days(),
                report.commit_metrics.total_commits,
                report.pull_metrics.total_prs
            ),
            key_insights: insights,
            recommendations,
            anomalies: vec![],
            confidence_score: 0.6,
        }
    }
}

// Expected shape of the model's JSON answer. Tolerant: missing lists default
// to empty, unknown severities fall back to LOW.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    summary: String,
    #[serde(default)]
    key_insights: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    anomalies: Vec<RawAnomaly>,
    #[serde(default = "default_confidence")]
    confidence_score: f64,
}

#[derive(Debug, Deserialize)]
struct RawAnomaly {
    #[serde(default)]
    metric_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    severity: String,
}

fn default_confidence() -> f64 {
    0.8
}

/// Client for the completion endpoint.
pub struct InsightAnalyzer {
    http: reqwest::Client,
    api_key: String,
    options: AnalyzerOptions,
}

impl fmt::Debug for InsightAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsightAnalyzer")
            .field("api_key", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl InsightAnalyzer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            options: AnalyzerOptions::default(),
        }
    }

    /// Creates an analyzer from the `OPENAI_API_KEY` environment variable.
    ///
    /// Returns an error if the variable is missing or empty.
    pub fn from_env() -> std::result::Result<Self, String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| "missing OPENAI_API_KEY environment variable".to_owned())?;
        if api_key.trim().is_empty() {
            return Err("OPENAI_API_KEY is set but empty".to_owned());
        }
        Ok(Self::new(api_key))
    }

    /// Applies analyzer options such as endpoint, model, and retry behavior.
    pub fn with_options(mut self, opts: AnalyzerOptions) -> Self {
        self.options = opts;
        self
    }

    /// Generates a full analysis of the report.
    pub async fn analyze(&self, report: &ProductivityReport) -> Result<AnalysisReport> {
        let prompt = analysis_prompt(report)?;
        let response = self.complete(&prompt, true).await?;

        let raw: RawAnalysis = serde_json::from_str(&response).map_err(|err| {
            GitPulseError::Decode(format!("completion response is not valid analysis JSON: {err}"))
        })?;

        let anomalies = raw
            .anomalies
            .into_iter()
            .map(|anomaly| Anomaly {
                metric_name: anomaly.metric_name,
                description: anomaly.description,
                severity: match anomaly.severity.as_str() {
                    "HIGH" => Severity::High,
                    "MEDIUM" => Severity::Medium,
                    _ => Severity::Low,
                },
            })
            .collect();

        tracing::debug!("completion analysis parsed");
        Ok(AnalysisReport {
            generated_at: Utc::now(),
            summary: raw.summary,
            key_insights: raw.key_insights,
            recommendations: raw.recommendations,
            anomalies,
            confidence_score: raw.confidence_score.clamp(0.0, 1.0),
        })
    }

    /// Answers a free-form question about the report. Returns the completion
    /// text as-is.
    pub async fn ask(&self, question: &str, report: &ProductivityReport) -> Result<String> {
        let prompt = question_prompt(question, report)?;
        self.complete(&prompt, false).await
    }

    /// The completion retry loop: 429 and 5xx back off exponentially up to
    /// the retry ceiling, 401 fails immediately.
    async fn complete(&self, prompt: &str, want_json: bool) -> Result<String> {
        let request = CompletionRequest {
            model: self.options.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_owned(),
                    content: SYSTEM_PROMPT.to_owned(),
                },
                ChatMessage {
                    role: "user".to_owned(),
                    content: prompt.to_owned(),
                },
            ],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            response_format: want_json.then(|| ResponseFormat {
                kind: "json_object".to_owned(),
            }),
        };

        let base = Duration::from_millis(self.options.retry_backoff_ms);
        let cap = Duration::from_millis(self.options.retry_cap_ms);
        let mut attempt = 0usize;

        loop {
            let response = self
                .http
                .post(&self.options.api_url)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
                .header(header::CONTENT_TYPE, "application/json")
                .timeout(Duration::from_millis(self.options.timeout_ms))
                .json(&request)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.map_err(GitPulseError::Transport)?;

                    if status.is_success() {
                        let parsed: CompletionResponse =
                            serde_json::from_str(&body).map_err(|err| {
                                GitPulseError::Decode(format!(
                                    "invalid completion response JSON: {err}"
                                ))
                            })?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|choice| choice.message.content)
                            .ok_or_else(|| {
                                GitPulseError::Decode(
                                    "completion response contains no choices".to_owned(),
                                )
                            });
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        return Err(GitPulseError::Auth {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        if attempt < self.options.max_retries {
                            let delay = backoff_delay(attempt, base, cap);
                            tracing::warn!(
                                status = status.as_u16(),
                                delay_ms = delay.as_millis() as u64,
                                "completion endpoint busy; backing off"
                            );
                            sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        if status == StatusCode::TOO_MANY_REQUESTS {
                            return Err(GitPulseError::RateLimited {
                                attempts: attempt + 1,
                                reset_at: None,
                            });
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
                    if (err.is_timeout() || err.is_request() || err.is_body() || err.is_connect())
                        && attempt < self.options.max_retries
                    {
                        let delay = backoff_delay(attempt, base, cap);
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

fn metrics_summary_json(report: &ProductivityReport) -> Result<String> {
    let summary = serde_json::json!({
        "period": format!(
            "{} to {}",
            report.period_start.format("%Y-%m-%d"),
            report.period_end.format("%Y-%m-%d")
        ),
        "total_commits": report.commit_metrics.total_commits,
        "total_prs": report.pull_metrics.total_prs,
        "merged_prs": report.pull_metrics.merged_prs,
        "merge_rate": report.pull_metrics.merge_rate,
        "total_reviews_given": report.review_metrics.total_reviews_given,
        "total_reviews_received": report.review_metrics.total_reviews_received,
        "approval_rate": report.review_metrics.approval_rate,
        "total_issues": report.issue_metrics.total_issues,
        "closed_issues": report.issue_metrics.closed_issues,
        "resolution_rate": report.issue_metrics.resolution_rate,
        "daily_commit_average": report.daily_commit_average(),
    });
    serde_json::to_string_pretty(&summary)
        .map_err(|err| GitPulseError::Decode(format!("failed to serialize metrics summary: {err}")))
}

fn analysis_prompt(report: &ProductivityReport) -> Result<String> {
    Ok(format!(
        r#"Analyze the following developer productivity metrics and provide comprehensive insights.

PRODUCTIVITY METRICS DATA:
{summary}

DETAILED METRICS:
- Commit Activity: {commits} commits, avg {avg_add:.1} additions, {avg_del:.1} deletions per commit
- Pull Requests: {prs} total, {merged} merged ({merge_rate:.1}% merge rate)
- Code Reviews: {given} given, {received} received
- Issues: {issues} total, {closed} closed ({resolution:.1}% resolution rate)

Please provide:
1. SUMMARY: A 2-3 sentence overview of overall productivity
2. KEY_INSIGHTS: 3-5 specific observations about patterns, strengths, or areas of concern
3. RECOMMENDATIONS: 3-5 actionable suggestions for improvement
4. ANOMALIES: Any unusual patterns or outliers that warrant attention

Format your response as JSON with the following structure:
{{
    "summary": "Brief overview of productivity",
    "key_insights": ["insight 1", "insight 2", "insight 3"],
    "recommendations": ["recommendation 1", "recommendation 2", "recommendation 3"],
    "anomalies": [
        {{
            "metric_name": "metric name",
            "description": "description of anomaly",
            "severity": "LOW|MEDIUM|HIGH"
        }}
    ],
    "confidence_score": 0.85
}}

Focus on actionable insights that can help improve developer productivity and code quality.
"#,
        summary = metrics_summary_json(report)?,
        commits = report.commit_metrics.total_commits,
        avg_add = report.commit_metrics.average_additions,
        avg_del = report.commit_metrics.average_deletions,
        prs = report.pull_metrics.total_prs,
        merged = report.pull_metrics.merged_prs,
        merge_rate = report.pull_metrics.merge_rate,
        given = report.review_metrics.total_reviews_given,
        received = report.review_metrics.total_reviews_received,
        issues = report.issue_metrics.total_issues,
        closed = report.issue_metrics.closed_issues,
        resolution = report.issue_metrics.resolution_rate,
    ))
}

fn question_prompt(question: &str, report: &ProductivityReport) -> Result<String> {
    Ok(format!(
        r#"Answer the user's question about their GitHub productivity data.

USER QUESTION: {question}

PRODUCTIVITY CONTEXT:
{summary}

AVAILABLE DATA:
- Commit metrics: frequency, code changes, timing patterns
- Pull request metrics: creation, merge rates, review times
- Code review metrics: participation, approval rates
- Issue metrics: creation, resolution rates
- Time-series velocity data showing trends over time

Provide a helpful, specific answer based on the available data. If the question cannot be
answered with the available data, explain what additional information would be needed.
Include specific numbers from the data when relevant.
"#,
        summary = metrics_summary_json(report)?,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{analysis_prompt, AnalysisReport, InsightAnalyzer, RawAnalysis, Severity};
    use crate::metrics::productivity_report;
    use crate::Commit;

    fn sample_report(commit_count: usize) -> crate::ProductivityReport {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let commits: Vec<Commit> = (0..commit_count)
            .map(|i| Commit {
                sha: format!("sha{i}"),
                author: "kit".to_owned(),
                timestamp: start + chrono::Duration::hours(i as i64),
                message: "change".to_owned(),
                additions: 5,
                deletions: 1,
                files_changed: 1,
            })
            .collect();
        productivity_report(
            &commits,
            &[],
            &[],
            start,
            start + chrono::Duration::days(10),
        )
    }

    #[test]
    fn fallback_flags_low_commit_frequency() {
        let report = sample_report(3);
        let analysis = AnalysisReport::fallback(&report);

        assert_eq!(analysis.confidence_score, 0.6);
        assert!(analysis
            .key_insights
            .iter()
            .any(|insight| insight.contains("Low commit frequency")));
        assert!(analysis
            .recommendations
            .iter()
            .any(|rec| rec.contains("smaller commits")));
    }

    #[test]
    fn fallback_on_empty_report_still_has_content() {
        let report = sample_report(0);
        let analysis = AnalysisReport::fallback(&report);

        assert!(!analysis.key_insights.is_empty());
        assert!(!analysis.recommendations.is_empty());
        assert!(analysis.anomalies.is_empty());
    }

    #[test]
    fn analysis_prompt_embeds_metrics() {
        let prompt = analysis_prompt(&sample_report(3)).expect("must render");
        assert!(prompt.contains("\"total_commits\": 3"));
        assert!(prompt.contains("confidence_score"));
    }

    #[test]
    fn raw_analysis_tolerates_missing_fields() {
        let raw: RawAnalysis =
            serde_json::from_str(r#"{"summary": "quiet week"}"#).expect("must parse");
        assert_eq!(raw.summary, "quiet week");
        assert!(raw.key_insights.is_empty());
        assert_eq!(raw.confidence_score, 0.8);
    }

    #[test]
    fn unknown_severity_defaults_to_low() {
        let raw: RawAnalysis = serde_json::from_str(
            r#"{"summary": "s", "anomalies": [{"metric_name": "m", "description": "d", "severity": "WILD"}]}"#,
        )
        .expect("must parse");
        assert_eq!(raw.anomalies.len(), 1);

        // Severity mapping happens in analyze(); mirror it here.
        let severity = match raw.anomalies[0].severity.as_str() {
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            _ => Severity::Low,
        };
        assert_eq!(severity, Severity::Low);
    }

    #[test]
    fn debug_redacts_api_key() {
        let analyzer = InsightAnalyzer::new("sk-secret");
        let debug = format!("{analyzer:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("sk-secret"));
    }
}
