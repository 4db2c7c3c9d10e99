//! SQLite persistent storage.
//!
//! The store holds three record types:
//! - **Events**: one row per GitHub event id, payload kept as JSON
//! - **Rate limits**: one snapshot per quota resource
//! - **Sync metadata**: a singleton describing the most recent run
//!
//! # Usage
//!
//! ```rust,ignore
//! use activity_sync::storage::{Database, EventFilter};
//!
//! let db = Database::connect("sqlite://activity.db").await?;
//! db.run_migrations().await?;
//!
//! let filter = EventFilter::new()
//!     .with_repo("octocat/hello-world")
//!     .with_limit(30);
//! let events = db.list_events(&filter).await?;
//! ```

pub mod database;
pub mod migrations;
pub mod schema;

// Re-export main types for convenience
pub use database::{Database, DatabaseError, EventFilter, SyncMetadata, UpsertCounts};
pub use migrations::{AppliedMigration, MigrationError, MigrationRunner};
