//! HTTP route handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::ApiError;
use super::query::{EventsQuery, SyncQuery};
use super::AppState;
use crate::events::{describe, matches_description, strip_event_suffix, Event};
use crate::github::{ContributionCalendar, GitHubApi, RateLimitInfo, CORE_RESOURCE};
use crate::metrics::export_metrics;
use crate::storage::SyncMetadata;
use crate::sync::{SyncMode, SyncPipeline, SyncReport};

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: SyncReport,
}

/// An event as listed, with its one-line summary.
#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub description: String,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        let description = describe(&event);
        Self { event, description }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventView>,
    /// Matches for repository, action and date; the description filter is not counted.
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    #[serde(rename = "syncMetadata")]
    pub sync_metadata: Option<SyncMetadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersResponse {
    pub repositories: Vec<String>,
    pub action_types: Vec<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsResponse {
    pub username: String,
    pub calendar: ContributionCalendar,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub rate_limit: Option<RateLimitInfo>,
    pub sync_metadata: Option<SyncMetadata>,
}

/// Handle POST /api/github/sync
///
/// Requires `Authorization: Bearer <SYNC_SECRET>`. `?full=true` forces a
/// full refresh. Runs in this process are serialized, and a run finishes
/// even if the caller disconnects.
pub async fn handle_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SyncQuery>,
) -> Result<Json<SyncResponse>, ApiError> {
    let secret = state
        .sync_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Config("SYNC_SECRET is not configured".to_string()))?;

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {secret}"));
    if !authorized {
        tracing::warn!("sync request rejected: bad or missing bearer token");
        return Err(ApiError::Unauthorized);
    }

    let (github, username) = upstream(&state)?;
    let pipeline = SyncPipeline::new(github, state.db.clone(), username, state.settings)?;

    let mode = SyncMode::from_full_flag(params.full_refresh());
    let guard = state.sync_lock.clone().lock_owned().await;
    // The run outlives the request so its metadata is always written.
    let run = tokio::spawn(async move {
        let _guard = guard;
        pipeline.run(mode).await
    });
    let report = run
        .await
        .map_err(|e| ApiError::Internal(format!("sync task failed: {e}")))??;

    Ok(Json(SyncResponse {
        success: true,
        report,
    }))
}

/// Handle GET /api/github/events
pub async fn handle_events(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let page = params.page();
    let per_page = params.per_page();
    let filter = params.to_filter(Utc::now());

    let total = state.db.count_events(&filter).await?;
    let offset = i64::from(page - 1) * i64::from(per_page);
    let events = state
        .db
        .list_events(
            &filter
                .with_limit(i64::from(per_page))
                .with_offset(offset),
        )
        .await?;

    let events: Vec<EventView> = match params.description() {
        Some(needle) => events
            .into_iter()
            .filter(|event| matches_description(event, needle))
            .map(EventView::from)
            .collect(),
        None => events.into_iter().map(EventView::from).collect(),
    };

    Ok(Json(EventsResponse {
        events,
        total,
        page,
        per_page,
        total_pages: total.div_ceil(u64::from(per_page)),
        sync_metadata: state.db.sync_metadata().await?,
    }))
}

/// Handle GET /api/github/filters
pub async fn handle_filters(
    State(state): State<AppState>,
) -> Result<Json<FiltersResponse>, ApiError> {
    let repositories = state.db.distinct_repositories().await?;

    let mut action_types: Vec<String> = state
        .db
        .distinct_event_types()
        .await?
        .iter()
        .map(|t| strip_event_suffix(t).to_string())
        .collect();
    action_types.sort();
    action_types.dedup();

    let last_updated = state.db.sync_metadata().await?.map(|m| m.last_sync);

    Ok(Json(FiltersResponse {
        repositories,
        action_types,
        last_updated,
    }))
}

/// Handle GET /api/github/contributions
pub async fn handle_contributions(
    State(state): State<AppState>,
) -> Result<Json<ContributionsResponse>, ApiError> {
    let (github, username) = upstream(&state)?;

    match github.contribution_calendar(&username).await {
        Ok(response) => {
            if let Some(info) = &response.rate_limit {
                state.db.save_rate_limit(info).await?;
            }
            Ok(Json(ContributionsResponse {
                username,
                calendar: response.data,
            }))
        }
        Err(err) => {
            if let Some(info) = err.rate_limit() {
                state.db.save_rate_limit(info).await?;
            }
            Err(err.into())
        }
    }
}

/// Handle GET /api/github/status
pub async fn handle_status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    Ok(Json(StatusResponse {
        rate_limit: state.db.rate_limit(CORE_RESOURCE).await?,
        sync_metadata: state.db.sync_metadata().await?,
    }))
}

/// Handle GET /metrics - Prometheus text format
pub async fn handle_metrics() -> String {
    export_metrics()
}

/// Handle GET /health
pub async fn handle_health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

fn upstream(state: &AppState) -> Result<(Arc<dyn GitHubApi>, String), ApiError> {
    let github = state
        .github
        .clone()
        .ok_or_else(|| ApiError::Config("GITHUB_TOKEN is not configured".to_string()))?;
    let username = state
        .username
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::Config("GITHUB_USERNAME is not configured".to_string()))?;
    Ok((github, username))
}
