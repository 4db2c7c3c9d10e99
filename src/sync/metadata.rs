//! Recording the outcome of a run in the singleton sync metadata record.

use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::storage::{Database, DatabaseError};

use super::SyncReport;

pub async fn record_success(db: &Database, report: &SyncReport) -> Result<(), DatabaseError> {
    db.record_sync_success(
        report.last_sync,
        report.total_events_in_db,
        report.new_event_count,
        report.mode.is_full(),
    )
    .await
}

/// Best-effort: a failure to write the failure record is logged and dropped.
pub async fn record_failure(db: &Database, at: DateTime<Utc>, full_refresh: bool, err: &SyncError) {
    if let Err(write_err) = db
        .record_sync_failure(at, full_refresh, &err.to_string())
        .await
    {
        tracing::error!(
            error = %write_err,
            sync_error = %err,
            "failed to record sync failure"
        );
    }
}
