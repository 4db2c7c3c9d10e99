//! reqwest-backed GitHub client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::rate_limit::parse_rate_limit_headers;
use super::types::{
    ApiCommit, ApiComparison, ApiResponse, CommitSummary, Comparison, ContributionCalendar,
    ContributionsData, FileChange, GraphQlResponse, PullRequestDetail, RawEvent,
};
use super::{ApiResult, GitHubApi};
use crate::error::GitHubError;
use crate::metrics::MetricsCollector;

/// GitHub REST API base URL.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = "activity-sync/1.0";

const CONTRIBUTIONS_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    contributionsCollection {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            date
            contributionCount
            color
          }
        }
      }
    }
  }
}
"#;

/// Authenticated GitHub API client.
///
/// Constructed once per process and handed to the sync pipeline and the
/// HTTP handlers; it holds no mutable state.
#[derive(Clone)]
pub struct HttpGitHubClient {
    http_client: Client,
    token: String,
    api_base: String,
    metrics: MetricsCollector,
}

impl HttpGitHubClient {
    /// Create a client against `https://api.github.com`.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, GITHUB_API_BASE)
    }

    /// Create a client against a different API root (GitHub Enterprise, test servers).
    pub fn with_base_url(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            metrics: MetricsCollector::new(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("Authorization", format!("Bearer {}", self.token))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> ApiResult<T> {
        let url = format!("{}{}", self.api_base, path);
        tracing::debug!(operation, url = %url, "GitHub request");

        let response = self
            .request(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| {
                self.metrics.record_upstream_request(operation, "transport_error");
                GitHubError::Transport(e.to_string())
            })?;

        self.decode(operation, response).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: Response,
    ) -> ApiResult<T> {
        let status = response.status();
        let rate_limit = parse_rate_limit_headers(response.headers());
        self.metrics
            .record_upstream_request(operation, status.as_str());
        if let Some(info) = &rate_limit {
            self.metrics.set_rate_limit_remaining(&info.resource, info.remaining);
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GitHubError::Http {
                status: status.as_u16(),
                body,
                rate_limit,
            });
        }

        let data = response
            .json::<T>()
            .await
            .map_err(|e| GitHubError::Decode(format!("{operation}: {e}")))?;

        Ok(ApiResponse::new(data, rate_limit))
    }
}

#[async_trait]
impl GitHubApi for HttpGitHubClient {
    async fn list_user_events(
        &self,
        username: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<RawEvent>> {
        let path = format!(
            "/users/{}/events?per_page={}&page={}",
            urlencoding::encode(username),
            per_page,
            page
        );
        self.get_json("list_user_events", &path).await
    }

    async fn get_pull_request(&self, repo: &str, number: u64) -> ApiResult<PullRequestDetail> {
        let path = format!("/repos/{repo}/pulls/{number}");
        self.get_json("get_pull_request", &path).await
    }

    async fn list_pull_request_commits(
        &self,
        repo: &str,
        number: u64,
    ) -> ApiResult<Vec<CommitSummary>> {
        let path = format!("/repos/{repo}/pulls/{number}/commits?per_page=100");
        let response: ApiResponse<Vec<ApiCommit>> =
            self.get_json("list_pull_request_commits", &path).await?;
        Ok(ApiResponse::new(
            response.data.into_iter().map(CommitSummary::from).collect(),
            response.rate_limit,
        ))
    }

    async fn list_pull_request_files(
        &self,
        repo: &str,
        number: u64,
    ) -> ApiResult<Vec<FileChange>> {
        let path = format!("/repos/{repo}/pulls/{number}/files?per_page=100");
        self.get_json("list_pull_request_files", &path).await
    }

    async fn compare_commits(&self, repo: &str, base: &str, head: &str) -> ApiResult<Comparison> {
        let path = format!(
            "/repos/{repo}/compare/{}...{}",
            urlencoding::encode(base),
            urlencoding::encode(head)
        );
        let response: ApiResponse<ApiComparison> = self.get_json("compare_commits", &path).await?;
        Ok(ApiResponse::new(response.data.into(), response.rate_limit))
    }

    async fn contribution_calendar(&self, username: &str) -> ApiResult<ContributionCalendar> {
        let url = format!("{}/graphql", self.api_base);
        let body = serde_json::json!({
            "query": CONTRIBUTIONS_QUERY,
            "variables": { "login": username },
        });

        let response = self
            .request(self.http_client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                self.metrics
                    .record_upstream_request("contribution_calendar", "transport_error");
                GitHubError::Transport(e.to_string())
            })?;

        let response: ApiResponse<GraphQlResponse<ContributionsData>> =
            self.decode("contribution_calendar", response).await?;

        if let Some(err) = response.data.errors.first() {
            return Err(GitHubError::Decode(format!("GraphQL error: {}", err.message)));
        }

        let calendar = response
            .data
            .data
            .and_then(|d| d.user)
            .map(|u| u.contributions_collection.contribution_calendar)
            .ok_or_else(|| GitHubError::Decode(format!("user '{username}' not found")))?;

        Ok(ApiResponse::new(calendar, response.rate_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpGitHubClient::with_base_url("token", "https://ghe.example.com/api/v3/");
        assert_eq!(client.api_base(), "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_default_base_url() {
        let client = HttpGitHubClient::new("token");
        assert_eq!(client.api_base(), GITHUB_API_BASE);
    }
}
