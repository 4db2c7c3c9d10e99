//! Query-string parameters for the read endpoints.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Deserialize;

use crate::events::event_type_for_action;
use crate::storage::EventFilter;

pub const DEFAULT_PER_PAGE: u32 = 30;
pub const MAX_PER_PAGE: u32 = 100;

/// `GET /api/github/events` parameters.
///
/// Numeric parameters are parsed leniently: anything unparseable falls back
/// to the default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub repo: Option<String>,
    pub action: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

impl EventsQuery {
    /// 1-based page number.
    pub fn page(&self) -> u32 {
        parse_positive(self.page.as_deref()).unwrap_or(1)
    }

    pub fn per_page(&self) -> u32 {
        parse_positive(self.per_page.as_deref())
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE)
    }

    /// Description needle, if one was given.
    pub fn description(&self) -> Option<&str> {
        non_empty(self.description.as_deref())
    }

    /// Store-side filter (repository, action type, date window), without paging.
    pub fn to_filter(&self, now: DateTime<Utc>) -> EventFilter {
        let mut filter = EventFilter::new();

        if let Some(repo) = non_empty(self.repo.as_deref()) {
            filter = filter.with_repo(repo);
        }
        if let Some(action) = non_empty(self.action.as_deref()) {
            filter = filter.with_event_type(event_type_for_action(action));
        }
        if let Some(window) = self.date.as_deref().and_then(DateWindow::parse) {
            let (start, end) = window.bounds(now);
            filter = filter.with_created_after(start);
            if let Some(end) = end {
                filter = filter.with_created_before(end);
            }
        }

        filter
    }
}

/// `POST /api/github/sync` parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub full: Option<String>,
}

impl SyncQuery {
    pub fn full_refresh(&self) -> bool {
        matches!(
            self.full.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "1" | "yes")
        )
    }
}

/// Named date windows, evaluated in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Today,
    Yesterday,
    Week,
    Month,
}

impl DateWindow {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Some(DateWindow::Today),
            "yesterday" => Some(DateWindow::Yesterday),
            "week" => Some(DateWindow::Week),
            "month" => Some(DateWindow::Month),
            _ => None,
        }
    }

    /// Inclusive start and optional exclusive end.
    pub fn bounds(self, now: DateTime<Utc>) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        let start_of_today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        match self {
            DateWindow::Today => (start_of_today, None),
            DateWindow::Yesterday => (start_of_today - Duration::days(1), Some(start_of_today)),
            DateWindow::Week => (now - Duration::days(7), None),
            DateWindow::Month => (now - Duration::days(30), None),
        }
    }
}

fn parse_positive(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty() && *v != "all")
}
