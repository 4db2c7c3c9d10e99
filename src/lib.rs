//! activity-sync: mirror a GitHub user's activity feed into SQLite.
//!
//! The sync pipeline ([`sync`]) pulls the user's event feed through the
//! [`github::GitHubApi`] trait, enriches pull requests and pushes, and writes
//! the result to the [`storage`] layer. The [`server`] module serves filtered
//! views of the stored events and a protected sync trigger.

pub mod cli;
pub mod error;
pub mod events;
pub mod github;
pub mod metrics;
pub mod server;
pub mod storage;
pub mod sync;

// Re-export commonly used error types
pub use error::{FailureClass, GitHubError, SyncError};
pub use storage::DatabaseError;
