//! Wire types for the GitHub REST and GraphQL APIs.
//!
//! The normalized types ([`CommitSummary`], [`FileChange`],
//! [`PullRequestDetail`]) are also embedded in stored event payloads, so
//! their field names follow GitHub's own payload shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rate_limit::RateLimitInfo;

/// A successful API response together with its rate-limit headers.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub rate_limit: Option<RateLimitInfo>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, rate_limit: Option<RateLimitInfo>) -> Self {
        Self { data, rate_limit }
    }
}

/// One entry of `GET /users/{username}/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub actor: ActorRef,
    pub repo: RepoRef,
    #[serde(default)]
    pub payload: Value,
    #[serde(default = "default_public")]
    pub public: bool,
    pub created_at: String,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorRef {
    pub login: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub login: String,
}

/// Commit author as it appears in push payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A commit in the shape GitHub uses inside `PushEvent.payload.commits`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A commit from the pulls/commits and compare endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCommit {
    pub sha: String,
    pub commit: ApiCommitDetail,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

impl From<ApiCommit> for CommitSummary {
    fn from(commit: ApiCommit) -> Self {
        CommitSummary {
            sha: commit.sha,
            message: commit.commit.message,
            author: commit.commit.author,
            url: commit.html_url,
        }
    }
}

/// One changed file from the pulls/files and compare endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

/// Pull request detail; the events feed carries a trimmed version of this
/// object and `GET /repos/{repo}/pulls/{n}` the complete one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestDetail {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub body: Option<String>,
    pub html_url: Option<String>,
    pub user: Option<UserRef>,
    pub merged: Option<bool>,
    pub merged_at: Option<String>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub changed_files: Option<u64>,
    pub commits: Option<u64>,
}

/// `GET /repos/{repo}/compare/{base}...{head}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiComparison {
    #[serde(default)]
    pub total_commits: u64,
    #[serde(default)]
    pub commits: Vec<ApiCommit>,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

/// Normalized commit-range comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    pub total_commits: u64,
    pub commits: Vec<CommitSummary>,
    pub files: Vec<FileChange>,
}

impl From<ApiComparison> for Comparison {
    fn from(raw: ApiComparison) -> Self {
        Comparison {
            total_commits: raw.total_commits,
            commits: raw.commits.into_iter().map(CommitSummary::from).collect(),
            files: raw.files,
        }
    }
}

/// Contribution calendar from the GraphQL `contributionsCollection` query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendar {
    pub total_contributions: u64,
    pub weeks: Vec<ContributionWeek>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionWeek {
    pub contribution_days: Vec<ContributionDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDay {
    pub date: String,
    pub contribution_count: u64,
    #[serde(default)]
    pub color: Option<String>,
}

/// GraphQL envelope: `{"data": {...}, "errors": [...]}`.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ContributionsData {
    pub user: Option<ContributionsUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsUser {
    pub contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsCollection {
    pub contribution_calendar: ContributionCalendar,
}
