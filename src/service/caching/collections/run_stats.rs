use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timestamp;
use crate::service::caching::{Artifact, ArtifactStore, CacheError};

/// Lightweight run metadata rewritten on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub count: usize,
    pub days_ahead: i64,
    pub days_back: i64,
    #[serde(rename = "lastUpdatedUtc", with = "crate::models::timestamp")]
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universe_count: Option<usize>,
    #[serde(
        rename = "calendarRowsFetched",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rows_fetched: Option<usize>,
    #[serde(
        rename = "calendarRowsAfterFilter",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rows_after_filter: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_exchanges: Vec<String>,
}

impl RunStats {
    /// Stats for a run that reused the existing index.
    pub fn cached(count: usize, days_ahead: i64, days_back: i64, now: DateTime<Utc>) -> Self {
        Self {
            count,
            days_ahead,
            days_back,
            last_updated: now,
            universe_count: None,
            rows_fetched: None,
            rows_after_filter: None,
            failed_exchanges: Vec::new(),
        }
    }
}

pub async fn write_stats(store: &ArtifactStore, stats: &RunStats) -> Result<(), CacheError> {
    let rendered = serde_json::to_string_pretty(stats)?;
    store.write(Artifact::RunStats, &rendered).await
}

/// Overwrite the plain-text last-run marker.
pub async fn write_last_run(store: &ArtifactStore, now: DateTime<Utc>) -> Result<(), CacheError> {
    store
        .write(Artifact::LastRun, &timestamp::format_utc(&now))
        .await
}
