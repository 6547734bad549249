use futures_util::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::RawEvent;
use crate::service::calendar::partition::DateRange;
use crate::service::finance::{FinanceServiceError, MarketDataSource};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("calendar source unavailable for {range}: {source}")]
    SourceUnavailable {
        range: DateRange,
        #[source]
        source: FinanceServiceError,
    },
}

/// Fetch every window and concatenate the rows in window order.
///
/// Up to `concurrency` windows are in flight at once; results are still
/// yielded in the order of `ranges`. The first failing window aborts the
/// whole fetch.
pub async fn fetch_all<S>(
    source: &S,
    ranges: &[DateRange],
    concurrency: usize,
) -> Result<Vec<RawEvent>, FetchError>
where
    S: MarketDataSource + ?Sized,
{
    info!(
        "Fetching earnings calendar in {} window(s), {} at a time",
        ranges.len(),
        concurrency.max(1)
    );

    let batches: Vec<Vec<RawEvent>> = stream::iter(ranges.iter().copied())
        .map(move |range| async move {
            source
                .earnings_calendar(range.from, range.to)
                .await
                .map_err(|err| {
                    warn!("Calendar window {} failed: {}", range, err);
                    FetchError::SourceUnavailable { range, source: err }
                })
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let rows: Vec<RawEvent> = batches.into_iter().flatten().collect();
    info!("Fetched {} calendar rows", rows.len());
    Ok(rows)
}
