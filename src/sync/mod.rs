//! The sync pipeline.
//!
//! One run is strictly sequential:
//!
//! ```text
//! QuotaCheck -> Fetching -> Enriching -> Persisting -> MetadataRecorded
//! ```
//!
//! A run rejected by the quota check performs no upstream calls and writes
//! nothing. Any failure after admission is recorded in the sync metadata
//! before it is returned. Nothing is retried; the incremental cutoff makes
//! the next run resume where this one stopped.

pub mod enricher;
pub mod fetcher;
pub mod metadata;
pub mod persist;
pub mod quota;
pub mod runner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use enricher::{EnrichmentStats, EventEnricher};
pub use fetcher::{EventFetcher, FetchedPages};
pub use quota::QuotaTracker;
pub use runner::SyncPipeline;

/// Events per upstream page (GitHub's maximum).
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Hard ceiling on pages requested per run.
pub const DEFAULT_MAX_PAGES: u32 = 3;

/// Pages that receive network enrichment.
pub const DEFAULT_ENRICH_PAGES: usize = 2;

/// Remaining-quota threshold for admission and early stop.
pub const DEFAULT_QUOTA_FLOOR: u32 = 10;

/// Tunables for a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub page_size: u32,
    pub max_pages: u32,
    pub enrich_pages: usize,
    pub quota_floor: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            enrich_pages: DEFAULT_ENRICH_PAGES,
            quota_floor: DEFAULT_QUOTA_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Fetch only events newer than the newest stored one and upsert them.
    Incremental,
    /// Re-fetch everything and replace the stored events.
    Full,
}

impl SyncMode {
    pub fn from_full_flag(full: bool) -> Self {
        if full {
            SyncMode::Full
        } else {
            SyncMode::Incremental
        }
    }

    pub fn is_full(self) -> bool {
        self == SyncMode::Full
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Incremental => "incremental",
            SyncMode::Full => "full",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub mode: SyncMode,
    /// Events inserted by this run.
    pub new_event_count: u64,
    pub duplicates_skipped: u64,
    pub total_events_in_db: u64,
    pub pages_checked: u32,
    pub last_sync: DateTime<Utc>,
    /// True when the run stopped early because the remaining quota hit the floor.
    pub partial: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SyncSettings::default();
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.max_pages, 3);
        assert_eq!(settings.enrich_pages, 2);
        assert_eq!(settings.quota_floor, 10);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(SyncMode::from_full_flag(true), SyncMode::Full);
        assert_eq!(
            serde_json::to_value(SyncMode::Incremental).unwrap(),
            serde_json::json!("incremental")
        );
    }
}
