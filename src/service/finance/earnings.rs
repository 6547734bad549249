use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::RawEvent;
use crate::service::finance::{get_bytes, parse_preview, FinanceServiceError, FinnhubClient};

#[derive(Debug, Deserialize)]
struct CalendarResponse {
    #[serde(default, rename = "earningsCalendar")]
    earnings_calendar: Option<Vec<RawEvent>>,
}

/// Fetch the earnings calendar for an inclusive date range.
pub async fn fetch_earnings_range(
    client: &FinnhubClient,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RawEvent>, FinanceServiceError> {
    let from_str = from.format("%Y-%m-%d").to_string();
    let to_str = to.format("%Y-%m-%d").to_string();

    debug!("Requesting earnings calendar {} to {}", from_str, to_str);

    let raw = get_bytes(
        client,
        "calendar/earnings",
        &[("from", from_str.as_str()), ("to", to_str.as_str())],
    )
    .await
    .inspect_err(|e| warn!("Earnings calendar request {} to {} failed: {}", from, to, e))?;

    let rows = parse_calendar(&raw)?;
    debug!("Received {} calendar rows for {} to {}", rows.len(), from, to);
    Ok(rows)
}

fn parse_calendar(raw: &[u8]) -> Result<Vec<RawEvent>, FinanceServiceError> {
    let parsed: Option<CalendarResponse> =
        serde_json::from_slice(raw).map_err(|e| parse_preview(raw, e))?;

    Ok(parsed
        .and_then(|body| body.earnings_calendar)
        .unwrap_or_default())
}
