//! Prometheus metrics registration and export.
//!
//! This module defines all Prometheus metrics used by activity-sync and provides
//! functions for initializing, registering, and exporting metrics.

use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all activity-sync metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total sync runs, labeled by outcome (success, rate_limited, quota_exhausted, error).
pub static SYNC_RUNS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Sync run duration in seconds.
pub static SYNC_DURATION: OnceLock<Histogram> = OnceLock::new();

/// 1 while a sync run is executing in this process.
pub static SYNC_IN_PROGRESS: OnceLock<Gauge> = OnceLock::new();

/// Events written to the store, labeled by mode (full/incremental).
pub static EVENTS_PERSISTED_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Upstream GitHub requests, labeled by operation and HTTP status.
pub static UPSTREAM_REQUESTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Last observed remaining quota, labeled by resource.
pub static RATE_LIMIT_REMAINING: OnceLock<GaugeVec> = OnceLock::new();

/// Enrichment calls that failed and were skipped, labeled by failure class.
pub static ENRICHMENT_FAILURES_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Call once at startup. A second call re-registers into a fresh registry
/// that is then discarded, so the first set of statics stays live.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails, typically due to
/// duplicate metric names or invalid metric configurations.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    // Run metrics
    let sync_runs_total = CounterVec::new(
        Opts::new("activity_sync_runs_total", "Total number of sync runs"),
        &["outcome"],
    )?;

    let sync_duration = Histogram::with_opts(
        HistogramOpts::new(
            "activity_sync_run_duration_seconds",
            "Sync run duration in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )?;

    let sync_in_progress = Gauge::new(
        "activity_sync_in_progress",
        "Whether a sync run is currently executing",
    )?;

    let events_persisted_total = CounterVec::new(
        Opts::new(
            "activity_sync_events_persisted_total",
            "Total events written to the store",
        ),
        &["mode"],
    )?;

    // Upstream metrics
    let upstream_requests_total = CounterVec::new(
        Opts::new(
            "activity_sync_upstream_requests_total",
            "Total GitHub API requests",
        ),
        &["operation", "status"],
    )?;

    let rate_limit_remaining = GaugeVec::new(
        Opts::new(
            "activity_sync_rate_limit_remaining",
            "Remaining GitHub API quota at last observation",
        ),
        &["resource"],
    )?;

    let enrichment_failures_total = CounterVec::new(
        Opts::new(
            "activity_sync_enrichment_failures_total",
            "Enrichment calls skipped after a failure",
        ),
        &["class"],
    )?;

    registry.register(Box::new(sync_runs_total.clone()))?;
    registry.register(Box::new(sync_duration.clone()))?;
    registry.register(Box::new(sync_in_progress.clone()))?;
    registry.register(Box::new(events_persisted_total.clone()))?;
    registry.register(Box::new(upstream_requests_total.clone()))?;
    registry.register(Box::new(rate_limit_remaining.clone()))?;
    registry.register(Box::new(enrichment_failures_total.clone()))?;

    // If any of these fail, metrics were already initialized (idempotent)
    let _ = REGISTRY.set(registry);
    let _ = SYNC_RUNS_TOTAL.set(sync_runs_total);
    let _ = SYNC_DURATION.set(sync_duration);
    let _ = SYNC_IN_PROGRESS.set(sync_in_progress);
    let _ = EVENTS_PERSISTED_TOTAL.set(events_persisted_total);
    let _ = UPSTREAM_REQUESTS_TOTAL.set(upstream_requests_total);
    let _ = RATE_LIMIT_REMAINING.set(rate_limit_remaining);
    let _ = ENRICHMENT_FAILURES_TOTAL.set(enrichment_failures_total);

    tracing::info!("Prometheus metrics initialized successfully");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
///
/// Returns a comment line instead of failing when the registry is not
/// initialized or encoding fails.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}
