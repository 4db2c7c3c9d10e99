//! One sync run, end to end.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::SyncError;
use crate::github::GitHubApi;
use crate::metrics::MetricsCollector;
use crate::storage::Database;

use super::enricher::EventEnricher;
use super::fetcher::EventFetcher;
use super::quota::QuotaTracker;
use super::{metadata, persist, SyncMode, SyncReport, SyncSettings};

/// Runs the fetch, enrich, persist sequence against one store.
#[derive(Clone)]
pub struct SyncPipeline {
    github: Arc<dyn GitHubApi>,
    db: Database,
    username: String,
    settings: SyncSettings,
    metrics: MetricsCollector,
}

impl SyncPipeline {
    /// Validates the configuration; no I/O happens here.
    pub fn new(
        github: Arc<dyn GitHubApi>,
        db: Database,
        username: impl Into<String>,
        settings: SyncSettings,
    ) -> Result<Self, SyncError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(SyncError::Config("GitHub username is not configured".to_string()));
        }
        if settings.page_size == 0 || settings.page_size > 100 {
            return Err(SyncError::Config(format!(
                "page size must be between 1 and 100, got {}",
                settings.page_size
            )));
        }
        if settings.max_pages == 0 {
            return Err(SyncError::Config("max pages must be at least 1".to_string()));
        }

        Ok(Self {
            github,
            db,
            username,
            settings,
            metrics: MetricsCollector::new(),
        })
    }

    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    /// Execute one run.
    ///
    /// A quota-check rejection returns [`SyncError::RateLimited`] without any
    /// upstream call or store write. Failures after admission are recorded in
    /// the sync metadata before being returned.
    pub async fn run(&self, mode: SyncMode) -> Result<SyncReport, SyncError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_run", run_id = %run_id, mode = mode.as_str());
        self.run_inner(mode).instrument(span).await
    }

    async fn run_inner(&self, mode: SyncMode) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        self.metrics.set_sync_in_progress(true);
        tracing::info!(username = %self.username, "sync started");

        let result = self.admit_and_execute(mode).await;

        self.metrics.set_sync_in_progress(false);
        let outcome = match &result {
            Ok(_) => "success",
            Err(SyncError::RateLimited { .. }) => "rate_limited",
            Err(SyncError::QuotaExhausted { .. }) => "quota_exhausted",
            Err(_) => "error",
        };
        self.metrics
            .record_sync_run(outcome, started.elapsed().as_secs_f64());

        match &result {
            Ok(report) => tracing::info!(
                new_events = report.new_event_count,
                duplicates = report.duplicates_skipped,
                total = report.total_events_in_db,
                pages = report.pages_checked,
                partial = report.partial,
                "sync finished"
            ),
            Err(err) => tracing::error!(error = %err, outcome, "sync failed"),
        }
        result
    }

    async fn admit_and_execute(&self, mode: SyncMode) -> Result<SyncReport, SyncError> {
        let mut quota = QuotaTracker::new(self.db.clone(), self.settings.quota_floor);
        quota.admit().await?;

        match self.execute(mode, &mut quota).await {
            Ok(report) => {
                metadata::record_success(&self.db, &report).await?;
                Ok(report)
            }
            Err(err) => {
                metadata::record_failure(&self.db, Utc::now(), mode.is_full(), &err).await;
                Err(err)
            }
        }
    }

    async fn execute(&self, mode: SyncMode, quota: &mut QuotaTracker) -> Result<SyncReport, SyncError> {
        let cutoff = match mode {
            SyncMode::Incremental => self.db.latest_event().await?.map(|e| e.created_at),
            SyncMode::Full => None,
        };
        if let Some(cutoff) = cutoff {
            tracing::debug!(cutoff = %cutoff, "incremental cutoff");
        }

        let fetcher = EventFetcher::new(self.github.as_ref(), &self.username, self.settings);
        let mut fetched = fetcher.fetch(cutoff, quota).await?;
        tracing::info!(
            events = fetched.event_count(),
            pages = fetched.pages_checked,
            "fetch complete"
        );

        let enricher = EventEnricher::new(self.github.as_ref(), self.settings.enrich_pages);
        enricher.enrich(&mut fetched.pages, quota).await?;

        let duplicates_skipped = fetched.duplicates_skipped;
        let pages_checked = fetched.pages_checked;
        let partial = fetched.partial;
        let events = fetched.into_events();

        let synced_at = Utc::now();
        let inserted = persist::persist_events(&self.db, mode, &events, synced_at).await?;
        self.metrics.record_events_persisted(mode.as_str(), inserted);

        let total_events_in_db = self.db.count_all_events().await?;

        Ok(SyncReport {
            mode,
            new_event_count: inserted,
            duplicates_skipped,
            total_events_in_db,
            pages_checked,
            last_sync: synced_at,
            partial,
        })
    }
}
