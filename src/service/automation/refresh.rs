use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::info;

use crate::config::IndexerConfig;
use crate::service::caching::collections::earnings_index;
use crate::service::caching::collections::run_stats::{self, RunStats};
use crate::service::caching::{Artifact, ArtifactStore, CacheError};
use crate::service::calendar::{self, DateRange, FetchError};
use crate::service::finance::MarketDataSource;
use crate::service::universe;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Per-run switches that do not come from the environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOptions {
    /// Ignore the freshness gate.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The stored index was young enough; nothing was fetched.
    Fresh {
        path: PathBuf,
        ttl_hours: i64,
        count: usize,
    },
    /// A new index was computed and compared against the stored one.
    Refreshed {
        path: PathBuf,
        count: usize,
        changed: bool,
        universe_count: Option<usize>,
        rows_fetched: usize,
        rows_after_filter: usize,
        failed_exchanges: Vec<String>,
    },
}

impl RefreshOutcome {
    pub fn count(&self) -> usize {
        match self {
            RefreshOutcome::Fresh { count, .. } | RefreshOutcome::Refreshed { count, .. } => *count,
        }
    }
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshOutcome::Fresh {
                path, ttl_hours, ..
            } => write!(
                f,
                "Cache fresh: {} age < {}h — skipping fetch.",
                path.display(),
                ttl_hours
            ),
            RefreshOutcome::Refreshed {
                path,
                count,
                changed: true,
                ..
            } => write!(f, "Updated {} with {} symbols.", path.display(), count),
            RefreshOutcome::Refreshed { path, .. } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                write!(f, "No changes in {name}; keep existing.")
            }
        }
    }
}

/// The look-back/look-ahead window around `now`'s calendar day.
///
/// Offsets beyond chrono's range saturate at `NaiveDate::MIN`/`MAX`.
pub fn fetch_window(config: &IndexerConfig, now: DateTime<Utc>) -> DateRange {
    let today = now.date_naive();
    let from = Duration::try_days(config.days_back)
        .and_then(|back| today.checked_sub_signed(back))
        .unwrap_or(NaiveDate::MIN);
    let to = Duration::try_days(config.days_ahead)
        .and_then(|ahead| today.checked_add_signed(ahead))
        .unwrap_or(NaiveDate::MAX);
    DateRange::new(from, to)
}

/// Run one indexing pass against `store`.
///
/// When the stored index is younger than the TTL only run metadata is
/// rewritten. Otherwise the universe is resolved, the calendar fetched
/// window by window and reduced, and the index written if its bytes changed.
/// A failed calendar window aborts before anything but the symbol cache is
/// written.
pub async fn run_refresh<S>(
    source: &S,
    store: &ArtifactStore,
    config: &IndexerConfig,
    options: RefreshOptions,
    now: DateTime<Utc>,
) -> Result<RefreshOutcome, RefreshError>
where
    S: MarketDataSource + ?Sized,
{
    store.ensure_layout().await?;
    let index_path = store.path(Artifact::EarningsIndex);

    let age = store.age(Artifact::EarningsIndex, now).await?;
    let ttl = Duration::try_hours(config.earnings_ttl_hours).unwrap_or(Duration::MAX);
    if let Some(age) = age.filter(|age| !options.force && *age < ttl) {
        let count = earnings_index::stored_count(store).await;
        info!(
            "Earnings index is {}m old (ttl {}h); reusing {} records",
            age.num_minutes(),
            config.earnings_ttl_hours,
            count
        );

        run_stats::write_stats(
            store,
            &RunStats::cached(count, config.days_ahead, config.days_back, now),
        )
        .await?;
        run_stats::write_last_run(store, now).await?;

        return Ok(RefreshOutcome::Fresh {
            path: index_path,
            ttl_hours: config.earnings_ttl_hours,
            count,
        });
    }

    let report = if config.exchanges.is_empty() {
        info!("No exchanges configured; indexing every calendar symbol");
        None
    } else {
        Some(
            universe::load_or_refresh(
                source,
                store,
                &config.exchanges,
                config.symbols_ttl_days,
                now,
            )
            .await?,
        )
    };
    let universe_count = report.as_ref().map(|r| r.universe.len());
    let failed_exchanges = report
        .as_ref()
        .map(|r| r.failed_exchanges.clone())
        .unwrap_or_default();

    let window = fetch_window(config, now);
    let ranges = calendar::month_ranges(window.from, window.to);
    info!("Calendar window {} split into {} month(s)", window, ranges.len());

    let rows = calendar::fetch_all(source, &ranges, config.fetch_concurrency).await?;
    let reduction = calendar::reduce(&rows, report.as_ref().map(|r| &r.universe), now);

    let changed = earnings_index::persist(store, &reduction.index).await?;
    info!(
        "Earnings index has {} symbols ({})",
        reduction.index.len(),
        if changed { "written" } else { "unchanged" }
    );

    let stats = RunStats {
        universe_count,
        rows_fetched: Some(reduction.stats.rows_total),
        rows_after_filter: Some(reduction.stats.rows_after_filter),
        failed_exchanges: failed_exchanges.clone(),
        ..RunStats::cached(reduction.index.len(), config.days_ahead, config.days_back, now)
    };
    run_stats::write_stats(store, &stats).await?;
    run_stats::write_last_run(store, now).await?;

    Ok(RefreshOutcome::Refreshed {
        path: index_path,
        count: reduction.index.len(),
        changed,
        universe_count,
        rows_fetched: reduction.stats.rows_total,
        rows_after_filter: reduction.stats.rows_after_filter,
        failed_exchanges,
    })
}
