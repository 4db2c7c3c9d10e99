//! HTTP error mapping.
//!
//! Error bodies share one shape: `{ "success": false, "error": "..." }`.
//! Quota rejections add `rateLimit` and `resetAt`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{GitHubError, SyncError};
use crate::storage::DatabaseError;

#[derive(Debug)]
pub enum ApiError {
    /// Missing or wrong bearer token.
    Unauthorized,
    /// Server-side configuration missing (token, username, secret).
    Config(String),
    Sync(SyncError),
    Upstream(GitHubError),
    Database(DatabaseError),
    /// The sync task panicked or was cancelled.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Sync(SyncError::RateLimited { .. } | SyncError::QuotaExhausted { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Upstream(err) if err.is_quota_exhausted() => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::Config(msg) | ApiError::Internal(msg) => msg.clone(),
            ApiError::Sync(err) => err.to_string(),
            ApiError::Upstream(err) => err.to_string(),
            ApiError::Database(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), "request failed");
        }

        let rate_limit = match &self {
            ApiError::Sync(SyncError::RateLimited { rate_limit }) => Some(rate_limit),
            ApiError::Sync(SyncError::QuotaExhausted { rate_limit }) => rate_limit.as_ref(),
            ApiError::Upstream(err) => err.rate_limit(),
            _ => None,
        };

        let mut body = json!({
            "success": false,
            "error": self.message(),
        });
        if status == StatusCode::TOO_MANY_REQUESTS {
            body["rateLimit"] = json!(rate_limit);
            body["resetAt"] = json!(rate_limit.map(|info| info.reset_at().to_rfc3339()));
        }

        (status, Json(body)).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Config(msg) => ApiError::Config(msg),
            other => ApiError::Sync(other),
        }
    }
}

impl From<GitHubError> for ApiError {
    fn from(err: GitHubError) -> Self {
        ApiError::Upstream(err)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Database(err)
    }
}
