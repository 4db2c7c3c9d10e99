//! High-level recording interface over the raw Prometheus metrics.
//!
//! Every method is a no-op when `init_metrics()` has not been called, so
//! library code and tests can record freely.

use super::prometheus::{
    ENRICHMENT_FAILURES_TOTAL, EVENTS_PERSISTED_TOTAL, RATE_LIMIT_REMAINING, SYNC_DURATION,
    SYNC_IN_PROGRESS, SYNC_RUNS_TOTAL, UPSTREAM_REQUESTS_TOTAL,
};

/// Metrics collector for recording sync and upstream metrics.
///
/// # Example
///
/// ```ignore
/// use activity_sync::metrics::{MetricsCollector, init_metrics};
///
/// init_metrics().expect("Failed to init metrics");
/// let collector = MetricsCollector::new();
///
/// collector.record_upstream_request("list_user_events", "200");
/// collector.record_sync_run("success", 3.2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Record a finished sync run.
    ///
    /// # Arguments
    ///
    /// * `outcome` - `success`, `rate_limited`, `quota_exhausted` or `error`
    /// * `duration_secs` - Wall time of the run in seconds
    pub fn record_sync_run(&self, outcome: &str, duration_secs: f64) {
        if let Some(runs) = SYNC_RUNS_TOTAL.get() {
            runs.with_label_values(&[outcome]).inc();
        }

        if let Some(duration) = SYNC_DURATION.get() {
            duration.observe(duration_secs);
        }

        tracing::trace!(
            outcome = outcome,
            duration_secs = duration_secs,
            "Recorded sync run metric"
        );
    }

    pub fn set_sync_in_progress(&self, running: bool) {
        if let Some(gauge) = SYNC_IN_PROGRESS.get() {
            gauge.set(if running { 1.0 } else { 0.0 });
        }
    }

    /// Record events written by one run.
    pub fn record_events_persisted(&self, mode: &str, count: u64) {
        if let Some(persisted) = EVENTS_PERSISTED_TOTAL.get() {
            persisted.with_label_values(&[mode]).inc_by(count as f64);
        }

        tracing::trace!(mode = mode, count = count, "Recorded persisted events metric");
    }

    /// Record one upstream request.
    ///
    /// # Arguments
    ///
    /// * `operation` - Client operation name (e.g. `get_pull_request`)
    /// * `status` - HTTP status code, or `error` when no response arrived
    pub fn record_upstream_request(&self, operation: &str, status: &str) {
        if let Some(requests) = UPSTREAM_REQUESTS_TOTAL.get() {
            requests.with_label_values(&[operation, status]).inc();
        }
    }

    pub fn set_rate_limit_remaining(&self, resource: &str, remaining: u32) {
        if let Some(gauge) = RATE_LIMIT_REMAINING.get() {
            gauge
                .with_label_values(&[resource])
                .set(f64::from(remaining));
        }

        tracing::trace!(
            resource = resource,
            remaining = remaining,
            "Updated rate limit metric"
        );
    }

    /// Record a skipped enrichment call, labeled by failure class.
    pub fn record_enrichment_failure(&self, class: &str) {
        if let Some(failures) = ENRICHMENT_FAILURES_TOTAL.get() {
            failures.with_label_values(&[class]).inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{export_metrics, init_metrics};

    fn ensure_metrics_init() {
        let _ = init_metrics();
    }

    #[test]
    fn test_metrics_collector_new() {
        let collector = MetricsCollector::new();
        assert!(std::mem::size_of_val(&collector) == 0);
    }

    #[test]
    fn test_record_sync_run() {
        ensure_metrics_init();
        let collector = MetricsCollector::new();

        collector.set_sync_in_progress(true);
        collector.record_sync_run("success", 2.5);
        collector.record_sync_run("rate_limited", 0.01);
        collector.set_sync_in_progress(false);
    }

    #[test]
    fn test_upstream_and_rate_limit_metrics_are_exported() {
        ensure_metrics_init();
        let collector = MetricsCollector::new();

        collector.record_upstream_request("list_user_events", "200");
        collector.set_rate_limit_remaining("core", 4321);
        collector.record_events_persisted("incremental", 12);
        collector.record_enrichment_failure("not_found");

        let text = export_metrics();
        assert!(text.contains("activity_sync_upstream_requests_total"));
        assert!(text.contains("activity_sync_rate_limit_remaining"));
    }
}
