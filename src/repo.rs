use chrono::{DateTime, Utc};

use crate::GitPulseError;

/// Identifies a repository by owner and name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, GitPulseError> {
        let owner = owner.into();
        let name = name.into();

        if owner.trim().is_empty() {
            return Err(GitPulseError::Decode(
                "repository owner cannot be empty".to_owned(),
            ));
        }
        if name.trim().is_empty() {
            return Err(GitPulseError::Decode(
                "repository name cannot be empty".to_owned(),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(GitPulseError::Decode(format!(
                "invalid repository name '{name}'"
            )));
        }

        Ok(Self { owner, name })
    }

    /// Parses an `owner/name` pair.
    pub fn from_full_name(full_name: &str) -> Result<Self, GitPulseError> {
        match full_name.split_once('/') {
            Some((owner, name)) => Self::new(owner, name),
            None => Err(GitPulseError::Decode(format!(
                "expected 'owner/name', got '{full_name}'"
            ))),
        }
    }

    /// Parses a `https://github.com/owner/name` URL, tolerating a trailing
    /// slash or `.git` suffix.
    pub fn from_url(url: &str) -> Result<Self, GitPulseError> {
        let rest = url
            .strip_prefix("https://github.com/")
            .ok_or_else(|| GitPulseError::Decode(format!("not a github.com URL: '{url}'")))?;
        let rest = rest.trim_end_matches('/');
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        Self::from_full_name(rest)
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Repository facts returned by an access check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoSummary {
    pub full_name: String,
    pub default_branch: String,
    pub private: bool,
}

/// State filter for pull request and issue listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateFilter {
    Open,
    Closed,
    #[default]
    All,
}

impl StateFilter {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

/// Filters for the commit listing. Immutable per call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitQuery {
    /// Only commits after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only commits up to this instant.
    pub until: Option<DateTime<Utc>>,
    /// Only commits by this author login.
    pub author: Option<String>,
}

impl CommitQuery {
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub(crate) fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(since) = self.since {
            pairs.push(("since".to_owned(), since.to_rfc3339()));
        }
        if let Some(until) = self.until {
            pairs.push(("until".to_owned(), until.to_rfc3339()));
        }
        if let Some(author) = &self.author {
            pairs.push(("author".to_owned(), author.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::{CommitQuery, GitPulseError, Repo, StateFilter};

    #[test]
    fn full_name_round_trip() {
        let repo = Repo::from_full_name("octocat/hello-world").expect("must parse");
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.name, "hello-world");
        assert_eq!(repo.full_name(), "octocat/hello-world");
    }

    #[test]
    fn url_parsing_strips_git_suffix() {
        let repo = Repo::from_url("https://github.com/octocat/hello-world.git").expect("must parse");
        assert_eq!(repo.full_name(), "octocat/hello-world");

        let repo = Repo::from_url("https://github.com/octocat/hello-world/").expect("must parse");
        assert_eq!(repo.full_name(), "octocat/hello-world");
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(matches!(
            Repo::new("", "x"),
            Err(GitPulseError::Decode(_))
        ));
        assert!(matches!(
            Repo::new("octocat", "has space"),
            Err(GitPulseError::Decode(_))
        ));
        assert!(matches!(
            Repo::from_full_name("no-slash"),
            Err(GitPulseError::Decode(_))
        ));
    }

    #[test]
    fn state_filter_values() {
        assert_eq!(StateFilter::Open.as_str(), "open");
        assert_eq!(StateFilter::default().as_str(), "all");
    }

    #[test]
    fn commit_query_pairs() {
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let query = CommitQuery::default().since(since).author("kit");

        let pairs = query.to_query_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "since");
        assert_eq!(pairs[1], ("author".to_owned(), "kit".to_owned()));
    }

    #[test]
    fn empty_commit_query_has_no_pairs() {
        assert!(CommitQuery::default().to_query_pairs().is_empty());
    }
}
