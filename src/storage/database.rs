//! SQLite document store for events, rate-limit snapshots and sync metadata.
//!
//! The store owns all three record types; the application keeps no
//! authoritative in-memory copy between runs.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::events::{Event, EventPayload};
use crate::github::RateLimitInfo;

use super::migrations::{AppliedMigration, MigrationError, MigrationRunner};
use super::schema::{self, SYNC_METADATA_ID};

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection to the database failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    /// A stored row could not be turned back into a record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// SQLite database client.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects to the database and returns a new client.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite://activity.db")
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        if database_url.contains(":memory:") {
            return Self::in_memory().await;
        }

        let opts = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(opts)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        tracing::info!(url = database_url, "database opened");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database.
    ///
    /// Every SQLite `:memory:` connection is a separate database, so the pool
    /// holds exactly one connection that is never recycled.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let runner = MigrationRunner::new(self.pool.clone());
        runner.run_migrations().await?;
        Ok(())
    }

    pub async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>, DatabaseError> {
        let runner = MigrationRunner::new(self.pool.clone());
        Ok(runner.list_applied_migrations().await?)
    }

    /// Creates the four event indexes if missing.
    pub async fn ensure_indexes(&self) -> Result<(), DatabaseError> {
        sqlx::query(schema::CREATE_EVENT_INDEXES)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Event Operations
    // =========================================================================

    /// The most recently created stored event.
    pub async fn latest_event(&self) -> Result<Option<Event>, DatabaseError> {
        let row = sqlx::query(
            r#"
            SELECT id, event_type, repo, actor, created_at, public, payload, enriched
            FROM github_events
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| event_from_row(&r)).transpose()
    }

    pub async fn get_event(&self, id: &str) -> Result<Option<Event>, DatabaseError> {
        let row = sqlx::query(
            r#"
            SELECT id, event_type, repo, actor, created_at, public, payload, enriched
            FROM github_events
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| event_from_row(&r)).transpose()
    }

    /// Deletes every event and inserts `events` in their place.
    ///
    /// Transactional. An id that appears more than once is inserted once
    /// (first occurrence wins). Returns the number of rows inserted.
    pub async fn replace_all_events(
        &self,
        events: &[Event],
        synced_at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM github_events")
            .execute(&mut *tx)
            .await?;

        let mut seen = HashSet::new();
        let mut inserted = 0u64;
        for event in events {
            if !seen.insert(event.id.as_str()) {
                continue;
            }
            let payload = serde_json::to_string(&event.payload.to_value()?)?;
            sqlx::query(
                r#"
                INSERT INTO github_events (
                    id, event_type, repo, actor, created_at, public, payload, enriched, synced_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&event.id)
            .bind(&event.event_type)
            .bind(&event.repo)
            .bind(&event.actor)
            .bind(event.created_at.timestamp())
            .bind(event.public)
            .bind(payload)
            .bind(event.enriched)
            .bind(synced_at)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Upserts each event keyed by id, reporting inserted vs. updated rows.
    pub async fn upsert_events(
        &self,
        events: &[Event],
        synced_at: DateTime<Utc>,
    ) -> Result<UpsertCounts, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut counts = UpsertCounts::default();

        for event in events {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM github_events WHERE id = ?1")
                .bind(&event.id)
                .fetch_optional(&mut *tx)
                .await?;

            let payload = serde_json::to_string(&event.payload.to_value()?)?;
            sqlx::query(
                r#"
                INSERT INTO github_events (
                    id, event_type, repo, actor, created_at, public, payload, enriched, synced_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO UPDATE SET
                    event_type = excluded.event_type,
                    repo = excluded.repo,
                    actor = excluded.actor,
                    created_at = excluded.created_at,
                    public = excluded.public,
                    payload = excluded.payload,
                    enriched = excluded.enriched,
                    synced_at = excluded.synced_at
                "#,
            )
            .bind(&event.id)
            .bind(&event.event_type)
            .bind(&event.repo)
            .bind(&event.actor)
            .bind(event.created_at.timestamp())
            .bind(event.public)
            .bind(payload)
            .bind(event.enriched)
            .bind(synced_at)
            .execute(&mut *tx)
            .await?;

            if exists.is_some() {
                counts.updated += 1;
            } else {
                counts.inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(counts)
    }

    /// Total number of stored events.
    pub async fn count_all_events(&self) -> Result<u64, DatabaseError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM github_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }

    /// Number of events matching the store-side part of `filter`.
    pub async fn count_events(&self, filter: &EventFilter) -> Result<u64, DatabaseError> {
        let (where_clause, binds) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM github_events{}", where_clause);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for bind in binds {
            query = match bind {
                FilterValue::Text(text) => query.bind(text),
                FilterValue::Int(value) => query.bind(value),
            };
        }

        let total = query.fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }

    /// Events matching `filter`, newest first.
    pub async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, DatabaseError> {
        let (where_clause, mut binds) = filter.where_clause();
        let mut sql = format!(
            "SELECT id, event_type, repo, actor, created_at, public, payload, enriched \
             FROM github_events{} ORDER BY created_at DESC, id DESC",
            where_clause
        );

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            binds.push(FilterValue::Int(limit));
            if let Some(offset) = filter.offset {
                sql.push_str(" OFFSET ?");
                binds.push(FilterValue::Int(offset));
            }
        }

        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = match bind {
                FilterValue::Text(text) => query.bind(text),
                FilterValue::Int(value) => query.bind(value),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(event_from_row).collect()
    }

    /// Sorted distinct repository names.
    pub async fn distinct_repositories(&self) -> Result<Vec<String>, DatabaseError> {
        let repos: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT repo FROM github_events ORDER BY repo")
                .fetch_all(&self.pool)
                .await?;
        Ok(repos)
    }

    /// Sorted distinct event type names (`PushEvent`, ...).
    pub async fn distinct_event_types(&self) -> Result<Vec<String>, DatabaseError> {
        let types: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT event_type FROM github_events ORDER BY event_type")
                .fetch_all(&self.pool)
                .await?;
        Ok(types)
    }

    // =========================================================================
    // Rate Limit Operations
    // =========================================================================

    /// Overwrites the snapshot for `info.resource`.
    pub async fn save_rate_limit(&self, info: &RateLimitInfo) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO rate_limits (resource, quota_limit, remaining, reset, checked_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(resource) DO UPDATE SET
                quota_limit = excluded.quota_limit,
                remaining = excluded.remaining,
                reset = excluded.reset,
                checked_at = excluded.checked_at
            "#,
        )
        .bind(&info.resource)
        .bind(i64::from(info.limit))
        .bind(i64::from(info.remaining))
        .bind(info.reset)
        .bind(info.checked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn rate_limit(&self, resource: &str) -> Result<Option<RateLimitInfo>, DatabaseError> {
        let row = sqlx::query(
            "SELECT resource, quota_limit, remaining, reset, checked_at FROM rate_limits WHERE resource = ?1",
        )
        .bind(resource)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(RateLimitInfo {
                resource: r.get("resource"),
                limit: r.get::<i64, _>("quota_limit").clamp(0, i64::from(u32::MAX)) as u32,
                remaining: r.get::<i64, _>("remaining").clamp(0, i64::from(u32::MAX)) as u32,
                reset: r.get("reset"),
                checked_at: r.get("checked_at"),
            })),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Sync Metadata Operations
    // =========================================================================

    /// Upserts the singleton record for a successful run.
    pub async fn record_sync_success(
        &self,
        last_sync: DateTime<Utc>,
        total_events: u64,
        new_events: u64,
        full_refresh: bool,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO sync_metadata (id, last_sync, total_events, new_events, full_refresh, success, error)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, NULL)
            ON CONFLICT(id) DO UPDATE SET
                last_sync = excluded.last_sync,
                total_events = excluded.total_events,
                new_events = excluded.new_events,
                full_refresh = excluded.full_refresh,
                success = 1,
                error = NULL
            "#,
        )
        .bind(SYNC_METADATA_ID)
        .bind(last_sync)
        .bind(total_events as i64)
        .bind(new_events as i64)
        .bind(full_refresh)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upserts the singleton record for a failed run, keeping the previous counts.
    pub async fn record_sync_failure(
        &self,
        last_sync: DateTime<Utc>,
        full_refresh: bool,
        error: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO sync_metadata (id, last_sync, total_events, new_events, full_refresh, success, error)
            VALUES (?1, ?2, 0, 0, ?3, 0, ?4)
            ON CONFLICT(id) DO UPDATE SET
                last_sync = excluded.last_sync,
                full_refresh = excluded.full_refresh,
                success = 0,
                error = excluded.error
            "#,
        )
        .bind(SYNC_METADATA_ID)
        .bind(last_sync)
        .bind(full_refresh)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn sync_metadata(&self) -> Result<Option<SyncMetadata>, DatabaseError> {
        let row = sqlx::query(
            r#"
            SELECT last_sync, total_events, new_events, full_refresh, success, error
            FROM sync_metadata
            WHERE id = ?1
            "#,
        )
        .bind(SYNC_METADATA_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SyncMetadata {
            last_sync: r.get("last_sync"),
            total_events: r.get::<i64, _>("total_events").max(0) as u64,
            new_events: r.get::<i64, _>("new_events").max(0) as u64,
            full_refresh: r.get("full_refresh"),
            success: r.get("success"),
            error: r.get("error"),
        }))
    }
}

fn event_from_row(row: &SqliteRow) -> Result<Event, DatabaseError> {
    let id: String = row.get("id");
    let event_type: String = row.get("event_type");
    let created_at: i64 = row.get("created_at");
    let payload: String = row.get("payload");

    let created_at = DateTime::from_timestamp(created_at, 0)
        .ok_or_else(|| DatabaseError::Corrupt(format!("event {id}: bad created_at {created_at}")))?;
    let payload = EventPayload::decode(&event_type, serde_json::from_str(&payload)?);

    Ok(Event {
        id,
        event_type,
        repo: row.get("repo"),
        actor: row.get("actor"),
        created_at,
        public: row.get("public"),
        payload,
        enriched: row.get("enriched"),
    })
}

/// Inserted vs. modified rows from [`Database::upsert_events`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}

/// Store-side filter criteria for listing events.
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    /// Exact repository name (`owner/name`).
    pub repo: Option<String>,
    /// Exact event type (`PushEvent`).
    pub event_type: Option<String>,
    /// Only events created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Only events created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
    /// Maximum number of results.
    pub limit: Option<i64>,
    /// Offset for pagination.
    pub offset: Option<i64>,
}

enum FilterValue {
    Text(String),
    Int(i64),
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    pub fn with_created_before(mut self, instant: DateTime<Utc>) -> Self {
        self.created_before = Some(instant);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn where_clause(&self) -> (String, Vec<FilterValue>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if let Some(ref repo) = self.repo {
            conditions.push("repo = ?");
            binds.push(FilterValue::Text(repo.clone()));
        }

        if let Some(ref event_type) = self.event_type {
            conditions.push("event_type = ?");
            binds.push(FilterValue::Text(event_type.clone()));
        }

        if let Some(after) = self.created_after {
            conditions.push("created_at >= ?");
            binds.push(FilterValue::Int(after.timestamp()));
        }

        if let Some(before) = self.created_before {
            conditions.push("created_at < ?");
            binds.push(FilterValue::Int(before.timestamp()));
        }

        if conditions.is_empty() {
            (String::new(), binds)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), binds)
        }
    }
}

/// Outcome of the most recent sync run (singleton record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub last_sync: DateTime<Utc>,
    pub total_events: u64,
    pub new_events: u64,
    pub full_refresh: bool,
    pub success: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::model::WatchPayload;

    fn watch_event(id: &str, created_at: i64, repo: &str) -> Event {
        Event {
            id: id.to_string(),
            event_type: "WatchEvent".to_string(),
            repo: repo.to_string(),
            actor: "octocat".to_string(),
            created_at: DateTime::from_timestamp(created_at, 0).unwrap(),
            public: true,
            payload: EventPayload::Watch(WatchPayload {
                action: "started".to_string(),
            }),
            enriched: false,
        }
    }

    async fn test_db() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_upsert_counts_inserted_and_updated() {
        let db = test_db().await;
        let now = Utc::now();

        let counts = db
            .upsert_events(&[watch_event("1", 100, "a/b"), watch_event("2", 200, "a/b")], now)
            .await
            .unwrap();
        assert_eq!(counts, UpsertCounts { inserted: 2, updated: 0 });

        let mut changed = watch_event("2", 200, "a/c");
        changed.enriched = true;
        let counts = db.upsert_events(&[changed], now).await.unwrap();
        assert_eq!(counts, UpsertCounts { inserted: 0, updated: 1 });

        assert_eq!(db.count_all_events().await.unwrap(), 2);
        let stored = db.get_event("2").await.unwrap().unwrap();
        assert_eq!(stored.repo, "a/c");
        assert!(stored.enriched);
    }

    #[tokio::test]
    async fn test_replace_all_dedupes_ids() {
        let db = test_db().await;
        db.upsert_events(&[watch_event("old", 50, "x/y")], Utc::now())
            .await
            .unwrap();

        let inserted = db
            .replace_all_events(
                &[
                    watch_event("1", 100, "a/b"),
                    watch_event("2", 90, "a/b"),
                    watch_event("1", 100, "a/b"),
                ],
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(db.count_all_events().await.unwrap(), 2);
        assert!(db.get_event("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_event_and_filters() {
        let db = test_db().await;
        db.upsert_events(
            &[
                watch_event("1", 100, "a/b"),
                watch_event("2", 300, "c/d"),
                watch_event("3", 200, "a/b"),
            ],
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(db.latest_event().await.unwrap().unwrap().id, "2");

        let filter = EventFilter::new().with_repo("a/b");
        assert_eq!(db.count_events(&filter).await.unwrap(), 2);
        let ids: Vec<String> = db
            .list_events(&filter.with_limit(10))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["3", "1"]);

        let recent = EventFilter::new()
            .with_created_after(DateTime::from_timestamp(200, 0).unwrap())
            .with_limit(1)
            .with_offset(1);
        let page = db.list_events(&recent).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "3");

        assert_eq!(db.distinct_repositories().await.unwrap(), vec!["a/b", "c/d"]);
        assert_eq!(db.distinct_event_types().await.unwrap(), vec!["WatchEvent"]);
    }

    #[tokio::test]
    async fn test_rate_limit_singleton_per_resource() {
        let db = test_db().await;
        let mut info = RateLimitInfo {
            resource: "core".to_string(),
            limit: 5000,
            remaining: 4000,
            reset: 1_900_000_000,
            checked_at: Utc::now(),
        };
        db.save_rate_limit(&info).await.unwrap();
        info.remaining = 3999;
        db.save_rate_limit(&info).await.unwrap();

        let stored = db.rate_limit("core").await.unwrap().unwrap();
        assert_eq!(stored.remaining, 3999);
        assert!(db.rate_limit("graphql").await.unwrap().is_none());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rate_limits")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_sync_metadata_failure_keeps_counts() {
        let db = test_db().await;
        db.record_sync_success(Utc::now(), 120, 20, false).await.unwrap();
        db.record_sync_failure(Utc::now(), true, "GitHub API returned 502")
            .await
            .unwrap();

        let meta = db.sync_metadata().await.unwrap().unwrap();
        assert!(!meta.success);
        assert!(meta.full_refresh);
        assert_eq!(meta.total_events, 120);
        assert_eq!(meta.error.as_deref(), Some("GitHub API returned 502"));
    }

    #[tokio::test]
    async fn test_ensure_indexes_is_repeatable() {
        let db = test_db().await;
        db.ensure_indexes().await.unwrap();
        db.ensure_indexes().await.unwrap();
    }

    #[test]
    fn test_database_error_display() {
        let err = DatabaseError::Corrupt("event 7".to_string());
        assert!(err.to_string().contains("event 7"));

        let err = DatabaseError::ConnectionFailed("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
