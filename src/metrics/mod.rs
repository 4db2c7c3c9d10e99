//! Prometheus metrics for sync runs and upstream GitHub traffic.
//!
//! # Example
//!
//! ```ignore
//! use activity_sync::metrics::{init_metrics, export_metrics, MetricsCollector};
//!
//! init_metrics().expect("Failed to initialize metrics");
//!
//! let collector = MetricsCollector::new();
//! collector.record_sync_run("success", 1.8);
//!
//! // Served on GET /metrics
//! let metrics_text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

// Re-export key types for convenient access
pub use collectors::MetricsCollector;
pub use prometheus::{export_metrics, init_metrics};

// Re-export metric constants for direct access when needed
pub use prometheus::{
    ENRICHMENT_FAILURES_TOTAL, EVENTS_PERSISTED_TOTAL, RATE_LIMIT_REMAINING, REGISTRY,
    SYNC_DURATION, SYNC_IN_PROGRESS, SYNC_RUNS_TOTAL, UPSTREAM_REQUESTS_TOTAL,
};
