//! Database schema constants and SQL queries.
//!
//! This module contains all SQL schema definitions for the SQLite document
//! store. Payloads are stored as JSON text; event creation times as epoch
//! seconds so ordering and date windows are plain integer comparisons.

/// SQL schema for creating the events table.
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS github_events (
    id          TEXT    PRIMARY KEY NOT NULL,
    event_type  TEXT    NOT NULL,
    repo        TEXT    NOT NULL,
    actor       TEXT    NOT NULL,
    created_at  INTEGER NOT NULL,
    public      INTEGER NOT NULL DEFAULT 1,
    payload     TEXT    NOT NULL,
    enriched    INTEGER NOT NULL DEFAULT 0,
    synced_at   TEXT    NOT NULL
)
"#;

/// SQL schema for creating the rate_limits table (one row per resource).
pub const CREATE_RATE_LIMITS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS rate_limits (
    resource     TEXT    PRIMARY KEY NOT NULL,
    quota_limit  INTEGER NOT NULL,
    remaining    INTEGER NOT NULL,
    reset        INTEGER NOT NULL,
    checked_at   TEXT    NOT NULL
)
"#;

/// SQL schema for creating the sync_metadata table (singleton row).
pub const CREATE_SYNC_METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sync_metadata (
    id            TEXT    PRIMARY KEY NOT NULL,
    last_sync     TEXT    NOT NULL,
    total_events  INTEGER NOT NULL DEFAULT 0,
    new_events    INTEGER NOT NULL DEFAULT 0,
    full_refresh  INTEGER NOT NULL DEFAULT 0,
    success       INTEGER NOT NULL,
    error         TEXT
)
"#;

/// Indexes on the events table. Safe to run before every sync.
pub const CREATE_EVENT_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_github_events_created_at ON github_events(created_at DESC);
CREATE UNIQUE INDEX IF NOT EXISTS idx_github_events_id ON github_events(id);
CREATE INDEX IF NOT EXISTS idx_github_events_repo ON github_events(repo);
CREATE INDEX IF NOT EXISTS idx_github_events_type ON github_events(event_type)
"#;

/// Returns all schema creation statements in the correct order.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_EVENTS_TABLE,
        CREATE_RATE_LIMITS_TABLE,
        CREATE_SYNC_METADATA_TABLE,
        CREATE_EVENT_INDEXES,
    ]
}

/// Fixed id of the singleton sync metadata row.
pub const SYNC_METADATA_ID: &str = "github_events_sync";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_schema_statements_order() {
        let statements = all_schema_statements();
        assert_eq!(statements.len(), 4);
        assert!(statements[0].contains("github_events"));
        // Indexes reference the events table, so they come last
        assert!(statements[3].contains("CREATE INDEX"));
    }

    #[test]
    fn test_event_indexes_cover_lookup_columns() {
        assert_eq!(CREATE_EVENT_INDEXES.matches("CREATE").count(), 4);
        assert!(CREATE_EVENT_INDEXES.contains("UNIQUE INDEX IF NOT EXISTS idx_github_events_id"));
        assert!(CREATE_EVENT_INDEXES.contains("created_at DESC"));
    }
}
