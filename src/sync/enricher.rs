//! Bounded, best-effort enrichment of fetched events.
//!
//! Only the first `enrich_pages` pages are enriched over the network. Pull
//! requests go first (detail, then commits, then files), then pushes that
//! lack a commit count (a `before...head` comparison). Pushes on later pages,
//! and pushes whose comparison fails, get `size = 1`.
//!
//! Per-item failures are logged and skipped. Only quota exhaustion changes
//! the course of the run: it stops all further enrichment calls.

use crate::error::{FailureClass, GitHubError};
use crate::events::{Event, EventPayload};
use crate::github::GitHubApi;
use crate::metrics::MetricsCollector;
use crate::storage::DatabaseError;

use super::quota::QuotaTracker;

/// Size recorded for a push whose commit count could not be determined.
pub const DEFAULT_PUSH_SIZE: u64 = 1;

/// Counters reported at the end of enrichment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub pull_requests_enriched: u32,
    pub pull_requests_skipped: u32,
    pub pushes_enriched: u32,
    pub pushes_defaulted: u32,
    pub quota_exhausted: bool,
}

pub struct EventEnricher<'a> {
    github: &'a dyn GitHubApi,
    enrich_pages: usize,
    metrics: MetricsCollector,
}

impl<'a> EventEnricher<'a> {
    pub fn new(github: &'a dyn GitHubApi, enrich_pages: usize) -> Self {
        Self {
            github,
            enrich_pages,
            metrics: MetricsCollector::new(),
        }
    }

    /// Enrich `pages` in place.
    ///
    /// Only store errors (while persisting rate-limit snapshots) are returned;
    /// upstream failures degrade the affected event instead.
    pub async fn enrich(
        &self,
        pages: &mut [Vec<Event>],
        quota: &mut QuotaTracker,
    ) -> Result<EnrichmentStats, DatabaseError> {
        let mut stats = EnrichmentStats::default();
        let split = self.enrich_pages.min(pages.len());
        let (head, tail) = pages.split_at_mut(split);

        for event in head.iter_mut().flatten() {
            if quota.is_exhausted() {
                break;
            }
            if matches!(event.payload, EventPayload::PullRequest(_)) && !event.enriched {
                if self.enrich_pull_request(event, quota).await? {
                    stats.pull_requests_enriched += 1;
                } else {
                    stats.pull_requests_skipped += 1;
                }
            }
        }

        for event in head.iter_mut().flatten() {
            if !event.push_missing_size() {
                continue;
            }
            if !quota.is_exhausted() && self.enrich_push(event, quota).await? {
                stats.pushes_enriched += 1;
            } else {
                set_push_size(event, DEFAULT_PUSH_SIZE);
                stats.pushes_defaulted += 1;
            }
        }

        for event in tail.iter_mut().flatten() {
            if event.push_missing_size() {
                set_push_size(event, DEFAULT_PUSH_SIZE);
                stats.pushes_defaulted += 1;
            }
        }

        stats.quota_exhausted = quota.is_exhausted();
        tracing::info!(
            pull_requests = stats.pull_requests_enriched,
            pull_requests_skipped = stats.pull_requests_skipped,
            pushes = stats.pushes_enriched,
            pushes_defaulted = stats.pushes_defaulted,
            quota_exhausted = stats.quota_exhausted,
            "enrichment finished"
        );
        Ok(stats)
    }

    /// Returns whether the event was marked enriched.
    async fn enrich_pull_request(
        &self,
        event: &mut Event,
        quota: &mut QuotaTracker,
    ) -> Result<bool, DatabaseError> {
        let Some(number) = event.pull_request_number() else {
            return Ok(false);
        };
        let repo = event.repo.clone();

        let detail = match self.github.get_pull_request(&repo, number).await {
            Ok(response) => {
                quota.observe(response.rate_limit.as_ref()).await?;
                response.data
            }
            Err(err) => {
                quota.observe_error(&err).await?;
                self.log_failure(&err, &repo, number, "pull request detail");
                return Ok(false);
            }
        };

        let mut commits = Vec::new();
        match self.github.list_pull_request_commits(&repo, number).await {
            Ok(response) => {
                quota.observe(response.rate_limit.as_ref()).await?;
                commits = response.data;
            }
            Err(err) => {
                quota.observe_error(&err).await?;
                self.log_failure(&err, &repo, number, "pull request commits");
            }
        }

        let mut files = Vec::new();
        if !quota.is_exhausted() {
            match self.github.list_pull_request_files(&repo, number).await {
                Ok(response) => {
                    quota.observe(response.rate_limit.as_ref()).await?;
                    files = response.data;
                }
                Err(err) => {
                    quota.observe_error(&err).await?;
                    self.log_failure(&err, &repo, number, "pull request files");
                }
            }
        }

        if let EventPayload::PullRequest(pr) = &mut event.payload {
            pr.pull_request = detail;
            pr.commit_list = commits;
            pr.files = files;
        }
        event.enriched = true;
        Ok(true)
    }

    /// Returns whether the push got its size from a comparison.
    async fn enrich_push(
        &self,
        event: &mut Event,
        quota: &mut QuotaTracker,
    ) -> Result<bool, DatabaseError> {
        let (before, head) = match &event.payload {
            EventPayload::Push(push) => match (&push.before, &push.head) {
                (Some(before), Some(head)) => (before.clone(), head.clone()),
                _ => return Ok(false),
            },
            _ => return Ok(false),
        };
        let repo = event.repo.clone();

        let comparison = match self.github.compare_commits(&repo, &before, &head).await {
            Ok(response) => {
                quota.observe(response.rate_limit.as_ref()).await?;
                response.data
            }
            Err(err) => {
                quota.observe_error(&err).await?;
                self.metrics.record_enrichment_failure(class_label(err.classify()));
                tracing::warn!(repo = %repo, head = %head, error = %err, "push comparison failed, defaulting size");
                return Ok(false);
            }
        };

        if let EventPayload::Push(push) = &mut event.payload {
            push.size = Some(comparison.total_commits);
            push.commits = comparison.commits;
            push.files = comparison.files;
        }
        Ok(true)
    }

    fn log_failure(&self, err: &GitHubError, repo: &str, number: u64, what: &str) {
        let class = err.classify();
        self.metrics.record_enrichment_failure(class_label(class));

        match class {
            FailureClass::QuotaExhausted => tracing::warn!(
                repo,
                pr = number,
                "rate limit exhausted while fetching {what}, stopping enrichment"
            ),
            FailureClass::AccessDenied | FailureClass::NotFound => tracing::info!(
                repo,
                pr = number,
                status = ?err.status(),
                "{what} not accessible, skipping"
            ),
            FailureClass::Other => tracing::warn!(
                repo,
                pr = number,
                error = %err,
                "failed to fetch {what}, skipping"
            ),
        }
    }
}

fn set_push_size(event: &mut Event, size: u64) {
    if let EventPayload::Push(push) = &mut event.payload {
        push.size = Some(size);
    }
}

fn class_label(class: FailureClass) -> &'static str {
    match class {
        FailureClass::QuotaExhausted => "quota_exhausted",
        FailureClass::AccessDenied => "access_denied",
        FailureClass::NotFound => "not_found",
        FailureClass::Other => "other",
    }
}
