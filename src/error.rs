//! Error types for activity-sync operations.
//!
//! Defines the error taxonomy for the sync pipeline:
//! - Configuration problems detected before any I/O
//! - Upstream GitHub API failures (HTTP status, transport, decoding)
//! - Document store failures
//!
//! Per-item enrichment failures are classified with [`FailureClass`] and
//! handled locally by the enricher; they never become a [`SyncError`].

use thiserror::Error;

use crate::github::RateLimitInfo;
use crate::storage::DatabaseError;

/// Errors returned by the GitHub API client.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API returned {status}: {body}")]
    Http {
        status: u16,
        body: String,
        /// Rate-limit headers observed on the failed response, if any.
        rate_limit: Option<RateLimitInfo>,
    },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Failed to decode GitHub response: {0}")]
    Decode(String),
}

/// How a failed upstream call should be treated by callers that can degrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The request quota is spent; no further calls should be made this run.
    QuotaExhausted,
    /// 403 on a resource the token cannot see (private repository, SSO).
    AccessDenied,
    /// 404: resource deleted or inaccessible.
    NotFound,
    /// Anything else (5xx, transport, malformed payload).
    Other,
}

impl GitHubError {
    /// HTTP status code, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate-limit snapshot carried by the failed response.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        match self {
            GitHubError::Http { rate_limit, .. } => rate_limit.as_ref(),
            _ => None,
        }
    }

    /// Classify the failure.
    ///
    /// A 403 only counts as quota exhaustion when the response reports zero
    /// remaining requests; otherwise it is an access-denied on one resource.
    pub fn classify(&self) -> FailureClass {
        match self {
            GitHubError::Http {
                status: 429,
                ..
            } => FailureClass::QuotaExhausted,
            GitHubError::Http {
                status: 403,
                rate_limit,
                ..
            } => match rate_limit {
                Some(info) if info.remaining == 0 => FailureClass::QuotaExhausted,
                _ => FailureClass::AccessDenied,
            },
            GitHubError::Http { status: 404, .. } => FailureClass::NotFound,
            _ => FailureClass::Other,
        }
    }

    pub fn is_quota_exhausted(&self) -> bool {
        self.classify() == FailureClass::QuotaExhausted
    }
}

/// Errors that terminate a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Admission check failed: the stored quota is below the floor and has not reset.
    #[error("Rate limit too low: {} requests remaining until {}", .rate_limit.remaining, .rate_limit.reset_at())]
    RateLimited { rate_limit: RateLimitInfo },

    /// The upstream quota ran out while the run was fetching.
    #[error("GitHub rate limit exhausted during sync")]
    QuotaExhausted { rate_limit: Option<RateLimitInfo> },

    #[error("Upstream error: {0}")]
    Upstream(GitHubError),

    #[error("Storage error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<GitHubError> for SyncError {
    fn from(err: GitHubError) -> Self {
        if err.is_quota_exhausted() {
            SyncError::QuotaExhausted {
                rate_limit: err.rate_limit().cloned(),
            }
        } else {
            SyncError::Upstream(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(remaining: u32) -> RateLimitInfo {
        RateLimitInfo {
            resource: "core".to_string(),
            limit: 5000,
            remaining,
            reset: Utc::now().timestamp() + 600,
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_forbidden_with_zero_remaining_is_quota_exhaustion() {
        let err = GitHubError::Http {
            status: 403,
            body: "API rate limit exceeded".to_string(),
            rate_limit: Some(snapshot(0)),
        };
        assert_eq!(err.classify(), FailureClass::QuotaExhausted);
    }

    #[test]
    fn test_forbidden_with_quota_left_is_access_denied() {
        let err = GitHubError::Http {
            status: 403,
            body: "Resource not accessible by integration".to_string(),
            rate_limit: Some(snapshot(4200)),
        };
        assert_eq!(err.classify(), FailureClass::AccessDenied);

        let err = GitHubError::Http {
            status: 403,
            body: String::new(),
            rate_limit: None,
        };
        assert_eq!(err.classify(), FailureClass::AccessDenied);
    }

    #[test]
    fn test_other_classes() {
        let err = GitHubError::Http {
            status: 404,
            body: "Not Found".to_string(),
            rate_limit: None,
        };
        assert_eq!(err.classify(), FailureClass::NotFound);

        let err = GitHubError::Http {
            status: 429,
            body: String::new(),
            rate_limit: None,
        };
        assert!(err.is_quota_exhausted());

        assert_eq!(
            GitHubError::Transport("connection reset".to_string()).classify(),
            FailureClass::Other
        );
    }

    #[test]
    fn test_sync_error_from_github_error() {
        let err: SyncError = GitHubError::Http {
            status: 403,
            body: String::new(),
            rate_limit: Some(snapshot(0)),
        }
        .into();
        assert!(matches!(err, SyncError::QuotaExhausted { rate_limit: Some(_) }));

        let err: SyncError = GitHubError::Http {
            status: 502,
            body: "Bad Gateway".to_string(),
            rate_limit: None,
        }
        .into();
        assert!(err.to_string().contains("502"));
    }
}
