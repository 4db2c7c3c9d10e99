//! Shared fixtures for the integration suites: a scripted GitHub API and
//! event builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use activity_sync::github::types::{ActorRef, RepoRef};
use activity_sync::github::{
    ApiResponse, ApiResult, CommitSummary, Comparison, ContributionCalendar, FileChange,
    GitHubApi, PullRequestDetail, RateLimitInfo, RawEvent,
};
use activity_sync::storage::Database;
use activity_sync::GitHubError;

pub const USERNAME: &str = "octocat";

/// Fixed reference time; events are laid out backwards from here.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn rate_limit(remaining: u32) -> RateLimitInfo {
    RateLimitInfo {
        resource: "core".to_string(),
        limit: 5000,
        remaining,
        reset: Utc::now().timestamp() + 3600,
        checked_at: Utc::now(),
    }
}

pub fn raw_event(
    id: &str,
    event_type: &str,
    repo: &str,
    created_at: DateTime<Utc>,
    payload: Value,
) -> RawEvent {
    RawEvent {
        id: id.to_string(),
        event_type: event_type.to_string(),
        actor: ActorRef {
            login: USERNAME.to_string(),
        },
        repo: RepoRef {
            name: repo.to_string(),
        },
        payload,
        public: true,
        created_at: created_at.to_rfc3339(),
    }
}

pub fn watch(id: &str, created_at: DateTime<Utc>) -> RawEvent {
    raw_event(id, "WatchEvent", "rust-lang/rust", created_at, json!({"action": "started"}))
}

/// A push without `size`, so enrichment has to fill it in.
pub fn push(id: &str, created_at: DateTime<Utc>) -> RawEvent {
    raw_event(
        id,
        "PushEvent",
        "octocat/hello",
        created_at,
        json!({
            "push_id": 1,
            "ref": "refs/heads/main",
            "before": format!("before-{id}"),
            "head": format!("head-{id}"),
        }),
    )
}

pub fn pull_request(id: &str, number: u64, created_at: DateTime<Utc>) -> RawEvent {
    raw_event(
        id,
        "PullRequestEvent",
        "octocat/hello",
        created_at,
        json!({
            "action": "opened",
            "number": number,
            "pull_request": {"number": number, "title": format!("Change {number}")},
        }),
    )
}

pub fn issue_comment(id: &str, number: u64, created_at: DateTime<Utc>) -> RawEvent {
    raw_event(
        id,
        "IssueCommentEvent",
        "octocat/hello",
        created_at,
        json!({
            "action": "created",
            "issue": {"number": number, "title": "Crash on start", "state": "open"},
            "comment": {"body": "Can reproduce"},
        }),
    )
}

/// `count` watch events, newest first, one minute apart, ids `{prefix}{n}`.
pub fn feed(prefix: &str, count: usize, newest: DateTime<Utc>) -> Vec<RawEvent> {
    (0..count)
        .map(|i| watch(&format!("{prefix}{i}"), newest - Duration::minutes(i as i64)))
        .collect()
}

pub async fn memory_db() -> Database {
    let db = Database::in_memory().await.unwrap();
    db.run_migrations().await.unwrap();
    db
}

/// Scripted [`GitHubApi`].
///
/// Every response reports `remaining` (or the per-page override) as the
/// core quota. Calls are recorded as `op:key` strings.
pub struct FakeGitHub {
    pages: Vec<Vec<RawEvent>>,
    remaining: u32,
    page_remaining: HashMap<u32, u32>,
    events_failure: Option<(u16, u32)>,
    pull_request_failures: HashMap<u64, (u16, u32)>,
    commits_failure: Option<(u16, u32)>,
    compare_failure: Option<(u16, u32)>,
    compare_delay: Option<std::time::Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub fn new(pages: Vec<Vec<RawEvent>>) -> Self {
        Self {
            pages,
            remaining: 4000,
            page_remaining: HashMap::new(),
            events_failure: None,
            pull_request_failures: HashMap::new(),
            commits_failure: None,
            compare_failure: None,
            compare_delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_remaining_after_page(mut self, page: u32, remaining: u32) -> Self {
        self.page_remaining.insert(page, remaining);
        self
    }

    pub fn fail_events(mut self, status: u16, remaining: u32) -> Self {
        self.events_failure = Some((status, remaining));
        self
    }

    pub fn fail_pull_request(mut self, number: u64, status: u16, remaining: u32) -> Self {
        self.pull_request_failures.insert(number, (status, remaining));
        self
    }

    pub fn fail_commits(mut self, status: u16, remaining: u32) -> Self {
        self.commits_failure = Some((status, remaining));
        self
    }

    pub fn fail_compare(mut self, status: u16, remaining: u32) -> Self {
        self.compare_failure = Some((status, remaining));
        self
    }

    /// Holds every compare call for `delay` before answering.
    pub fn delay_compare(mut self, delay: std::time::Duration) -> Self {
        self.compare_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        let prefix = format!("{op}:");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn ok<T>(&self, data: T) -> ApiResult<T> {
        Ok(ApiResponse::new(data, Some(rate_limit(self.remaining))))
    }

    fn failure<T>(&self, (status, remaining): (u16, u32)) -> ApiResult<T> {
        Err(GitHubError::Http {
            status,
            body: format!("scripted {status}"),
            rate_limit: Some(rate_limit(remaining)),
        })
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn list_user_events(
        &self,
        _username: &str,
        page: u32,
        _per_page: u32,
    ) -> ApiResult<Vec<RawEvent>> {
        self.record(format!("events:{page}"));
        if let Some(failure) = self.events_failure {
            return self.failure(failure);
        }

        let data = self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();
        let remaining = self
            .page_remaining
            .get(&page)
            .copied()
            .unwrap_or(self.remaining);
        Ok(ApiResponse::new(data, Some(rate_limit(remaining))))
    }

    async fn get_pull_request(&self, _repo: &str, number: u64) -> ApiResult<PullRequestDetail> {
        self.record(format!("pr:{number}"));
        if let Some(failure) = self.pull_request_failures.get(&number) {
            return self.failure(*failure);
        }
        self.ok(PullRequestDetail {
            number,
            title: format!("Change {number}"),
            state: "closed".to_string(),
            merged: Some(true),
            additions: Some(10),
            deletions: Some(2),
            changed_files: Some(1),
            commits: Some(1),
            ..Default::default()
        })
    }

    async fn list_pull_request_commits(
        &self,
        _repo: &str,
        number: u64,
    ) -> ApiResult<Vec<CommitSummary>> {
        self.record(format!("commits:{number}"));
        if let Some(failure) = self.commits_failure {
            return self.failure(failure);
        }
        self.ok(vec![CommitSummary {
            sha: format!("sha-{number}"),
            message: "Fix parser".to_string(),
            ..Default::default()
        }])
    }

    async fn list_pull_request_files(
        &self,
        _repo: &str,
        number: u64,
    ) -> ApiResult<Vec<FileChange>> {
        self.record(format!("files:{number}"));
        self.ok(vec![FileChange {
            filename: "src/parser.rs".to_string(),
            status: "modified".to_string(),
            additions: 10,
            deletions: 2,
            changes: 12,
            patch: None,
        }])
    }

    async fn compare_commits(&self, _repo: &str, _base: &str, head: &str) -> ApiResult<Comparison> {
        self.record(format!("compare:{head}"));
        if let Some(delay) = self.compare_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.compare_failure {
            return self.failure(failure);
        }
        self.ok(Comparison {
            total_commits: 2,
            commits: vec![
                CommitSummary {
                    sha: "c1".to_string(),
                    ..Default::default()
                },
                CommitSummary {
                    sha: "c2".to_string(),
                    ..Default::default()
                },
            ],
            files: Vec::new(),
        })
    }

    async fn contribution_calendar(&self, username: &str) -> ApiResult<ContributionCalendar> {
        self.record(format!("contributions:{username}"));
        Ok(ApiResponse::new(
            ContributionCalendar {
                total_contributions: 42,
                weeks: Vec::new(),
            },
            Some(RateLimitInfo {
                resource: "graphql".to_string(),
                ..rate_limit(4999)
            }),
        ))
    }
}
