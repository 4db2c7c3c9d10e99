//! Rate-limit admission control and tracking.
//!
//! A static threshold check against the stored `core` snapshot, plus an
//! unconditional overwrite of the snapshot after every upstream response.

use chrono::Utc;

use crate::error::{GitHubError, SyncError};
use crate::github::{RateLimitInfo, CORE_RESOURCE};
use crate::storage::{Database, DatabaseError};

/// Per-run view of the upstream quota.
pub struct QuotaTracker {
    db: Database,
    floor: u32,
    remaining: Option<u32>,
    exhausted: bool,
}

impl QuotaTracker {
    pub fn new(db: Database, floor: u32) -> Self {
        Self {
            db,
            floor,
            remaining: None,
            exhausted: false,
        }
    }

    /// Rejects the run when the stored `core` snapshot is at or below the
    /// floor and its reset time has not passed yet.
    pub async fn admit(&mut self) -> Result<(), SyncError> {
        let Some(snapshot) = self.db.rate_limit(CORE_RESOURCE).await? else {
            return Ok(());
        };

        if snapshot.blocks_run(self.floor, Utc::now()) {
            tracing::warn!(
                remaining = snapshot.remaining,
                reset_at = %snapshot.reset_at(),
                "rate limit below floor, sync rejected"
            );
            return Err(SyncError::RateLimited {
                rate_limit: snapshot,
            });
        }

        Ok(())
    }

    /// Persists the snapshot from a response, if it carried one.
    pub async fn observe(&mut self, info: Option<&RateLimitInfo>) -> Result<(), DatabaseError> {
        let Some(info) = info else {
            return Ok(());
        };

        self.db.save_rate_limit(info).await?;
        if info.resource == CORE_RESOURCE {
            self.remaining = Some(info.remaining);
        }
        Ok(())
    }

    /// Persists the snapshot carried by a failed response and notes quota exhaustion.
    pub async fn observe_error(&mut self, err: &GitHubError) -> Result<(), DatabaseError> {
        self.observe(err.rate_limit()).await?;
        if err.is_quota_exhausted() {
            self.exhausted = true;
        }
        Ok(())
    }

    /// Remaining `core` requests at the last observation.
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn below_floor(&self) -> bool {
        self.remaining.is_some_and(|r| r <= self.floor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(remaining: u32, reset_in: i64) -> RateLimitInfo {
        RateLimitInfo {
            resource: CORE_RESOURCE.to_string(),
            limit: 5000,
            remaining,
            reset: Utc::now().timestamp() + reset_in,
            checked_at: Utc::now(),
        }
    }

    async fn tracker() -> QuotaTracker {
        let db = Database::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        QuotaTracker::new(db, 10)
    }

    #[tokio::test]
    async fn test_admit_without_snapshot() {
        let mut quota = tracker().await;
        assert!(quota.admit().await.is_ok());
    }

    #[tokio::test]
    async fn test_admit_rejects_low_quota_before_reset() {
        let mut quota = tracker().await;
        quota.observe(Some(&snapshot(10, 600))).await.unwrap();

        let err = quota.admit().await.unwrap_err();
        assert!(matches!(err, SyncError::RateLimited { ref rate_limit } if rate_limit.remaining == 10));
    }

    #[tokio::test]
    async fn test_admit_allows_low_quota_after_reset() {
        let mut quota = tracker().await;
        quota.observe(Some(&snapshot(0, -5))).await.unwrap();
        assert!(quota.admit().await.is_ok());
    }

    #[tokio::test]
    async fn test_observe_tracks_core_remaining() {
        let mut quota = tracker().await;
        quota.observe(Some(&snapshot(11, 600))).await.unwrap();
        assert!(!quota.below_floor());

        let mut graphql = snapshot(3, 600);
        graphql.resource = "graphql".to_string();
        quota.observe(Some(&graphql)).await.unwrap();
        assert_eq!(quota.remaining(), Some(11));

        quota.observe(Some(&snapshot(9, 600))).await.unwrap();
        assert!(quota.below_floor());
    }

    #[tokio::test]
    async fn test_observe_error_marks_exhaustion() {
        let mut quota = tracker().await;
        let err = GitHubError::Http {
            status: 403,
            body: "API rate limit exceeded".to_string(),
            rate_limit: Some(snapshot(0, 600)),
        };
        quota.observe_error(&err).await.unwrap();

        assert!(quota.is_exhausted());
        assert_eq!(quota.remaining(), Some(0));
    }
}
