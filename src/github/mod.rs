//! GitHub API access.
//!
//! The sync pipeline talks to GitHub only through the [`GitHubApi`] trait so
//! that the client is an explicit dependency of every component. Every
//! successful call returns the rate-limit headers of its response alongside
//! the decoded body; failed calls carry them inside [`GitHubError::Http`].
//!
//! [`GitHubError::Http`]: crate::error::GitHubError::Http

pub mod client;
pub mod rate_limit;
pub mod types;

use async_trait::async_trait;

use crate::error::GitHubError;

pub use client::{HttpGitHubClient, GITHUB_API_BASE};
pub use rate_limit::{parse_rate_limit_headers, RateLimitInfo, CORE_RESOURCE};
pub use types::{
    ApiResponse, CommitAuthor, CommitSummary, Comparison, ContributionCalendar, ContributionDay,
    ContributionWeek, FileChange, PullRequestDetail, RawEvent, UserRef,
};

/// Result of one upstream call.
pub type ApiResult<T> = Result<ApiResponse<T>, GitHubError>;

/// The GitHub endpoints consumed by the sync pipeline and read endpoints.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `GET /users/{username}/events` (public and, for the token's own user, private).
    async fn list_user_events(
        &self,
        username: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<RawEvent>>;

    /// `GET /repos/{repo}/pulls/{number}`
    async fn get_pull_request(&self, repo: &str, number: u64) -> ApiResult<PullRequestDetail>;

    /// `GET /repos/{repo}/pulls/{number}/commits`
    async fn list_pull_request_commits(
        &self,
        repo: &str,
        number: u64,
    ) -> ApiResult<Vec<CommitSummary>>;

    /// `GET /repos/{repo}/pulls/{number}/files`
    async fn list_pull_request_files(&self, repo: &str, number: u64)
        -> ApiResult<Vec<FileChange>>;

    /// `GET /repos/{repo}/compare/{base}...{head}`
    async fn compare_commits(&self, repo: &str, base: &str, head: &str) -> ApiResult<Comparison>;

    /// GraphQL `contributionsCollection.contributionCalendar` for a user.
    async fn contribution_calendar(&self, username: &str) -> ApiResult<ContributionCalendar>;
}
