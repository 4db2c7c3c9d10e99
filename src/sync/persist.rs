//! Writing fetched events to the store.

use chrono::{DateTime, Utc};

use crate::events::Event;
use crate::storage::{Database, DatabaseError};

use super::SyncMode;

/// Persist `events` according to `mode` and return how many rows were inserted.
///
/// Indexes are (re)ensured first. A full refresh replaces the whole event
/// table in one transaction; an incremental run upserts by event id.
pub async fn persist_events(
    db: &Database,
    mode: SyncMode,
    events: &[Event],
    synced_at: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    db.ensure_indexes().await?;

    match mode {
        SyncMode::Full => {
            let inserted = db.replace_all_events(events, synced_at).await?;
            tracing::info!(inserted, "replaced all stored events");
            Ok(inserted)
        }
        SyncMode::Incremental => {
            let counts = db.upsert_events(events, synced_at).await?;
            if counts.updated > 0 {
                tracing::debug!(updated = counts.updated, "existing events updated in place");
            }
            tracing::info!(
                inserted = counts.inserted,
                updated = counts.updated,
                "upserted events"
            );
            Ok(counts.inserted)
        }
    }
}
