//! Report serialization to CSV, JSON, HTML, and plain text.
//!
//! Pure string building over already-computed metrics; writing the result
//! anywhere is the caller's business.

use chrono::{DateTime, Utc};

use crate::{AnalysisReport, GitPulseError, ProductivityReport, Result, Severity};

/// Export flavors with their file extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    MetricsCsv,
    VelocityCsv,
    MetricsJson,
    AnalysisText,
    DashboardHtml,
}

impl ExportKind {
    fn label(self) -> &'static str {
        match self {
            Self::MetricsCsv => "metrics",
            Self::VelocityCsv => "velocity",
            Self::MetricsJson => "metrics",
            Self::AnalysisText => "analysis",
            Self::DashboardHtml => "dashboard",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::MetricsCsv | Self::VelocityCsv => "csv",
            Self::MetricsJson => "json",
            Self::AnalysisText => "txt",
            Self::DashboardHtml => "html",
        }
    }
}

/// Deterministic export file name: kind, period end, generation time.
pub fn export_filename(
    kind: ExportKind,
    report: &ProductivityReport,
    generated_at: DateTime<Utc>,
) -> String {
    format!(
        "gitpulse_{}_{}_{}.{}",
        kind.label(),
        report.period_end.format("%Y%m%d"),
        generated_at.format("%Y%m%d%H%M%S"),
        kind.extension()
    )
}

/// Sectioned summary CSV: one `section,metric,value` row per figure.
pub fn metrics_csv(report: &ProductivityReport) -> String {
    let mut out = String::from("section,metric,value\n");

    let mut row = |section: &str, metric: &str, value: String| {
        out.push_str(&csv_field(section));
        out.push(',');
        out.push_str(&csv_field(metric));
        out.push(',');
        out.push_str(&csv_field(&value));
        out.push('\n');
    };

    row(
        "period",
        "start",
        report.period_start.format("%Y-%m-%d").to_string(),
    );
    row(
        "period",
        "end",
        report.period_end.format("%Y-%m-%d").to_string(),
    );
    row("period", "days", report.period_days().to_string());

    let commits = &report.commit_metrics;
    row("commits", "total", commits.total_commits.to_string());
    row(
        "commits",
        "daily_average",
        format!("{:.2}", report.daily_commit_average()),
    );
    row(
        "commits",
        "average_additions",
        format!("{:.2}", commits.average_additions),
    );
    row(
        "commits",
        "average_deletions",
        format!("{:.2}", commits.average_deletions),
    );
    row(
        "commits",
        "average_files_changed",
        format!("{:.2}", commits.average_files_changed),
    );

    let pulls = &report.pull_metrics;
    row("pull_requests", "total", pulls.total_prs.to_string());
    row("pull_requests", "merged", pulls.merged_prs.to_string());
    row("pull_requests", "closed", pulls.closed_prs.to_string());
    row("pull_requests", "open", pulls.open_prs.to_string());
    row(
        "pull_requests",
        "merge_rate",
        format!("{:.1}", pulls.merge_rate),
    );
    row(
        "pull_requests",
        "average_time_to_merge_hours",
        pulls
            .average_time_to_merge
            .map(|hours| format!("{hours:.1}"))
            .unwrap_or_default(),
    );

    let reviews = &report.review_metrics;
    row("reviews", "given", reviews.total_reviews_given.to_string());
    row(
        "reviews",
        "received",
        reviews.total_reviews_received.to_string(),
    );
    row(
        "reviews",
        "approval_rate",
        format!("{:.1}", reviews.approval_rate),
    );
    row(
        "reviews",
        "participation_rate",
        format!("{:.1}", reviews.review_participation_rate),
    );

    let issues = &report.issue_metrics;
    row("issues", "total", issues.total_issues.to_string());
    row("issues", "closed", issues.closed_issues.to_string());
    row("issues", "open", issues.open_issues.to_string());
    row(
        "issues",
        "resolution_rate",
        format!("{:.1}", issues.resolution_rate),
    );

    out
}

/// One row per velocity point.
pub fn velocity_csv(report: &ProductivityReport) -> String {
    let mut out = String::from("timestamp,commits,additions,deletions,pull_requests,issues_closed\n");
    for point in &report.velocity {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            point.timestamp.format("%Y-%m-%d"),
            point.commits,
            point.additions,
            point.deletions,
            point.pull_requests,
            point.issues_closed
        ));
    }
    out
}

/// Pretty-printed JSON of the full report.
pub fn metrics_json(report: &ProductivityReport) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|err| GitPulseError::Decode(format!("failed to serialize report: {err}")))
}

/// Plain-text rendering of an analysis report.
pub fn analysis_text(analysis: &AnalysisReport) -> String {
    let mut out = String::new();
    out.push_str("PRODUCTIVITY ANALYSIS\n");
    out.push_str(&format!(
        "Generated: {}\n\n",
        analysis.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str("SUMMARY\n");
    out.push_str(&analysis.summary);
    out.push_str("\n\nKEY INSIGHTS\n");
    for insight in &analysis.key_insights {
        out.push_str(&format!("- {insight}\n"));
    }
    out.push_str("\nRECOMMENDATIONS\n");
    for recommendation in &analysis.recommendations {
        out.push_str(&format!("- {recommendation}\n"));
    }
    if !analysis.anomalies.is_empty() {
        out.push_str("\nANOMALIES\n");
        for anomaly in &analysis.anomalies {
            let severity = match anomaly.severity {
                Severity::Low => "LOW",
                Severity::Medium => "MEDIUM",
                Severity::High => "HIGH",
            };
            out.push_str(&format!(
                "- [{severity}] {}: {}\n",
                anomaly.metric_name, anomaly.description
            ));
        }
    }
    out.push_str(&format!(
        "\nConfidence: {:.0}%\n",
        analysis.confidence_score * 100.0
    ));
    out
}

/// Self-contained static HTML summary of a report, with the analysis section
/// included when available.
pub fn dashboard_html(report: &ProductivityReport, analysis: Option<&AnalysisReport>) -> String {
    let mut tiles = String::new();
    let mut tile = |label: &str, value: String| {
        tiles.push_str(&format!(
            "<div class=\"tile\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>\n",
            html_escape(&value),
            html_escape(label)
        ));
    };

    tile("Commits", report.commit_metrics.total_commits.to_string());
    tile(
        "Pull requests",
        format!(
            "{} ({:.0}% merged)",
            report.pull_metrics.total_prs, report.pull_metrics.merge_rate
        ),
    );
    tile(
        "Reviews given",
        report.review_metrics.total_reviews_given.to_string(),
    );
    tile(
        "Issues resolved",
        format!(
            "{}/{}",
            report.issue_metrics.closed_issues, report.issue_metrics.total_issues
        ),
    );

    let mut velocity_rows = String::new();
    for point in &report.velocity {
        velocity_rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            point.timestamp.format("%Y-%m-%d"),
            point.commits,
            point.total_changes(),
            point.pull_requests,
            point.issues_closed
        ));
    }

    let analysis_section = match analysis {
        Some(analysis) => {
            let mut insights = String::new();
            for insight in &analysis.key_insights {
                insights.push_str(&format!("<li>{}</li>\n", html_escape(insight)));
            }
            let mut recommendations = String::new();
            for recommendation in &analysis.recommendations {
                recommendations.push_str(&format!("<li>{}</li>\n", html_escape(recommendation)));
            }
            format!(
                "<section><h2>Analysis</h2><p>{}</p><h3>Key insights</h3><ul>{}</ul>\
                 <h3>Recommendations</h3><ul>{}</ul></section>",
                html_escape(&analysis.summary),
                insights,
                recommendations
            )
        }
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Productivity report {start} – {end}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; color: #222; }}
.tiles {{ display: flex; gap: 1rem; flex-wrap: wrap; }}
.tile {{ border: 1px solid #ddd; border-radius: 8px; padding: 1rem 1.5rem; }}
.tile .value {{ font-size: 1.6rem; font-weight: bold; }}
.tile .label {{ color: #666; }}
table {{ border-collapse: collapse; margin-top: 1rem; }}
td, th {{ border: 1px solid #ddd; padding: 0.3rem 0.8rem; text-align: right; }}
</style>
</head>
<body>
<h1>Productivity report</h1>
<p>{start} – {end}</p>
<div class="tiles">
{tiles}</div>
<section>
<h2>Velocity</h2>
<table>
<tr><th>Date</th><th>Commits</th><th>Changes</th><th>PRs</th><th>Issues closed</th></tr>
{velocity_rows}</table>
</section>
{analysis_section}
</body>
</html>
"#,
        start = report.period_start.format("%Y-%m-%d"),
        end = report.period_end.format("%Y-%m-%d"),
    )
}

/// Quotes a CSV field when it contains a comma, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{
        analysis_text, csv_field, dashboard_html, export_filename, metrics_csv, metrics_json,
        velocity_csv, ExportKind,
    };
    use crate::metrics::productivity_report;
    use crate::{AnalysisReport, Anomaly, Commit, Severity};

    fn sample_report() -> crate::ProductivityReport {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let commits = vec![Commit {
            sha: "abc".to_owned(),
            author: "kit".to_owned(),
            timestamp: start + chrono::Duration::hours(9),
            message: "fix".to_owned(),
            additions: 10,
            deletions: 4,
            files_changed: 2,
        }];
        productivity_report(&commits, &[], &[], start, start + chrono::Duration::days(7))
    }

    fn sample_analysis() -> AnalysisReport {
        AnalysisReport {
            generated_at: Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap(),
            summary: "Steady week".to_owned(),
            key_insights: vec!["One commit <daily>".to_owned()],
            recommendations: vec!["Keep going".to_owned()],
            anomalies: vec![Anomaly {
                metric_name: "commits".to_owned(),
                description: "quiet Friday".to_owned(),
                severity: Severity::Medium,
            }],
            confidence_score: 0.9,
        }
    }

    #[test]
    fn csv_field_quotes_specials() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn metrics_csv_has_sections() {
        let csv = metrics_csv(&sample_report());
        assert!(csv.starts_with("section,metric,value\n"));
        assert!(csv.contains("commits,total,1"));
        assert!(csv.contains("period,days,7"));
        assert!(csv.contains("pull_requests,merge_rate,0.0"));
    }

    #[test]
    fn velocity_csv_one_row_per_point() {
        let report = sample_report();
        let csv = velocity_csv(&report);
        let rows = csv.lines().count();
        assert_eq!(rows, report.velocity.len() + 1);
        assert!(csv.contains("2024-03-01,1,10,4,0,0"));
    }

    #[test]
    fn metrics_json_round_trips() {
        let report = sample_report();
        let json = metrics_json(&report).expect("must serialize");
        let parsed: crate::ProductivityReport =
            serde_json::from_str(&json).expect("must deserialize");
        assert_eq!(parsed, report);
    }

    #[test]
    fn analysis_text_lists_everything() {
        let text = analysis_text(&sample_analysis());
        assert!(text.contains("Steady week"));
        assert!(text.contains("- One commit <daily>"));
        assert!(text.contains("[MEDIUM] commits: quiet Friday"));
        assert!(text.contains("Confidence: 90%"));
    }

    #[test]
    fn dashboard_html_escapes_and_embeds() {
        let html = dashboard_html(&sample_report(), Some(&sample_analysis()));
        assert!(html.contains("<h1>Productivity report</h1>"));
        assert!(html.contains("One commit &lt;daily&gt;"));
        assert!(html.contains("2024-03-01"));
    }

    #[test]
    fn export_filename_format() {
        let report = sample_report();
        let generated = Utc.with_ymd_and_hms(2024, 3, 8, 12, 30, 5).unwrap();
        assert_eq!(
            export_filename(ExportKind::MetricsCsv, &report, generated),
            "gitpulse_metrics_20240308_20240308123005.csv"
        );
        assert_eq!(
            export_filename(ExportKind::DashboardHtml, &report, generated),
            "gitpulse_dashboard_20240308_20240308123005.html"
        );
    }
}
