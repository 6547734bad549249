use chrono::{Duration, Utc};
use serde_json::to_string_pretty;
use std::path::Path;

use earnings_index::service::calendar::{month_ranges, reduce};
use earnings_index::service::finance::{FinnhubClient, MarketDataSource};
use earnings_index::IndexerConfig;

/// Integration test that calls the live Finnhub earnings calendar.
///
/// Needs `FINNHUB_TOKEN` (a `.env` file works) and outbound network access.
/// Run manually with:
/// `cargo test -- --ignored fetches_live_earnings_calendar`.
#[tokio::test]
#[ignore = "requires FINNHUB_TOKEN and external network access"]
async fn fetches_live_earnings_calendar() -> Result<(), Box<dyn std::error::Error>> {
    let config = IndexerConfig::from_env()?;
    let client = FinnhubClient::from_config(&config)?;

    let today = Utc::now().date_naive();
    let ranges = month_ranges(today, today + Duration::days(14));
    let mut rows = Vec::new();
    for range in &ranges {
        rows.extend(client.earnings_calendar(range.from, range.to).await?);
    }

    let index = reduce(&rows, None, Utc::now()).index;

    let pretty = to_string_pretty(&index)?;
    let out_path = Path::new("build-docs/json_output/earnings_index.json");
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out_path, &pretty)?;
    println!(
        "{} calendar rows reduced to {} symbols, saved to {}",
        rows.len(),
        index.len(),
        out_path.display()
    );

    assert!(
        !index.is_empty(),
        "expected at least one upcoming earnings event in the next two weeks"
    );

    Ok(())
}

/// Fetch one exchange listing from the live API.
#[tokio::test]
#[ignore = "requires FINNHUB_TOKEN and external network access"]
async fn fetches_live_symbol_listing() -> Result<(), Box<dyn std::error::Error>> {
    let config = IndexerConfig::from_env()?;
    let client = FinnhubClient::from_config(&config)?;

    let listings = client.exchange_symbols("US").await?;
    let equities = listings.iter().filter(|l| !l.is_fund_like()).count();
    println!("US lists {} instruments, {} non-fund", listings.len(), equities);

    assert!(equities > 0, "expected US equities in the listing");
    Ok(())
}
