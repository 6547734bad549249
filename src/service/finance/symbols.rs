use tracing::debug;

use crate::models::SymbolListing;
use crate::service::finance::{get_bytes, parse_preview, FinanceServiceError, FinnhubClient};

/// Fetch every listed instrument on one exchange.
pub async fn fetch_exchange_symbols(
    client: &FinnhubClient,
    exchange: &str,
) -> Result<Vec<SymbolListing>, FinanceServiceError> {
    debug!("Requesting symbol listing for exchange {}", exchange);

    let raw = get_bytes(client, "stock/symbol", &[("exchange", exchange)]).await?;
    let listings = parse_listing(&raw)?;

    debug!("Exchange {} listed {} instruments", exchange, listings.len());
    Ok(listings)
}

fn parse_listing(raw: &[u8]) -> Result<Vec<SymbolListing>, FinanceServiceError> {
    let parsed: Option<Vec<SymbolListing>> =
        serde_json::from_slice(raw).map_err(|e| parse_preview(raw, e))?;
    Ok(parsed.unwrap_or_default())
}
