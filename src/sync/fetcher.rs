//! Paginated event fetching with an incremental cutoff.

use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::events::Event;
use crate::github::GitHubApi;

use super::quota::QuotaTracker;
use super::SyncSettings;

/// New events grouped by the page they arrived on.
#[derive(Debug, Default)]
pub struct FetchedPages {
    pub pages: Vec<Vec<Event>>,
    /// Events at or before the cutoff that were dropped.
    pub duplicates_skipped: u64,
    pub pages_checked: u32,
    /// Pagination stopped because the remaining quota reached the floor.
    pub partial: bool,
}

impl FetchedPages {
    pub fn event_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.pages.into_iter().flatten().collect()
    }
}

pub struct EventFetcher<'a> {
    github: &'a dyn GitHubApi,
    username: &'a str,
    settings: SyncSettings,
}

impl<'a> EventFetcher<'a> {
    pub fn new(github: &'a dyn GitHubApi, username: &'a str, settings: SyncSettings) -> Self {
        Self {
            github,
            username,
            settings,
        }
    }

    /// Fetch pages newest-first until one of the stop conditions holds.
    ///
    /// With a `cutoff`, only events created strictly after it are kept. A page
    /// with no new events ends pagination, and so does a page with some old
    /// events (upstream order is newest-first, so the rest are old too).
    pub async fn fetch(
        &self,
        cutoff: Option<DateTime<Utc>>,
        quota: &mut QuotaTracker,
    ) -> Result<FetchedPages, SyncError> {
        let mut fetched = FetchedPages::default();

        for page in 1..=self.settings.max_pages {
            let response = match self
                .github
                .list_user_events(self.username, page, self.settings.page_size)
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    quota.observe_error(&err).await?;
                    tracing::error!(page, error = %err, "event page fetch failed");
                    return Err(err.into());
                }
            };
            quota.observe(response.rate_limit.as_ref()).await?;
            fetched.pages_checked += 1;

            let raw_len = response.data.len();
            if raw_len == 0 {
                tracing::debug!(page, "empty page, stopping");
                break;
            }

            let mut events: Vec<Event> = Vec::with_capacity(raw_len);
            for raw in response.data {
                let id = raw.id.clone();
                match Event::from_raw(raw) {
                    Some(event) => events.push(event),
                    None => tracing::warn!(event_id = %id, "skipping event with malformed created_at"),
                }
            }

            let mut boundary = false;
            if let Some(cutoff) = cutoff {
                let before = events.len();
                events.retain(|event| event.created_at > cutoff);
                let dropped = before - events.len();
                fetched.duplicates_skipped += dropped as u64;

                if events.is_empty() {
                    tracing::debug!(page, dropped, "no events newer than cutoff, stopping");
                    break;
                }
                boundary = dropped > 0;
            }

            tracing::info!(page, kept = events.len(), "fetched event page");
            fetched.pages.push(events);

            if boundary {
                tracing::debug!(page, "reached cutoff inside page, stopping");
                break;
            }
            if raw_len < self.settings.page_size as usize || page == self.settings.max_pages {
                break;
            }
            if quota.below_floor() {
                tracing::warn!(
                    page,
                    remaining = ?quota.remaining(),
                    "rate limit reached floor, stopping with partial results"
                );
                fetched.partial = true;
                break;
            }
        }

        Ok(fetched)
    }
}
