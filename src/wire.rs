use serde::{Deserialize, Serialize};

// ── GitHub REST payloads ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Viewer {
    pub login: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Commit entry as returned by the list endpoint. Stats require a follow-up
/// detail request.
#[derive(Debug, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetail {
    pub sha: String,
    pub commit: CommitInfo,
    #[serde(default)]
    pub stats: Option<CommitStats>,
    #[serde(default)]
    pub files: Option<Vec<CommitFile>>,
}

#[derive(Debug, Deserialize)]
pub struct CommitInfo {
    pub author: GitActor,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct GitActor {
    pub name: String,
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

#[derive(Debug, Deserialize)]
pub struct CommitFile {
    #[allow(dead_code)]
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct PullSummary {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub struct PullDetail {
    pub number: u64,
    pub title: String,
    pub user: Account,
    pub state: String,
    pub created_at: String,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub commits: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReviewEntry {
    pub user: Account,
    pub state: String,
    /// Absent on reviews left in the PENDING state.
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Issue entry. The issues feed also carries pull requests, marked by the
/// presence of the `pull_request` key.
#[derive(Debug, Deserialize)]
pub struct IssueEntry {
    pub number: u64,
    pub title: String,
    pub user: Account,
    pub state: String,
    pub created_at: String,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub assignee: Option<Account>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
}

// ── Chat completion payloads ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: String,
}
