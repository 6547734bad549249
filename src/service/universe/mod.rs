//! Eligible-symbol universe, cached per exchange list.
//!
//! The cached universe is reused while it is younger than the staleness
//! window and was built from the same set of exchanges. Otherwise each
//! exchange is queried on its own; an exchange whose listing fails is
//! reported and skipped, leaving a smaller universe rather than no universe.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::models::SymbolUniverse;
use crate::service::caching::collections::symbol_universe::{
    self, SymbolCacheDocument, SymbolCacheMeta,
};
use crate::service::caching::{ArtifactStore, CacheError};
use crate::service::finance::MarketDataSource;

/// Result of querying one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Loaded { exchange: String, symbols: usize },
    Unavailable { exchange: String, reason: String },
}

impl ExchangeOutcome {
    pub fn exchange(&self) -> &str {
        match self {
            ExchangeOutcome::Loaded { exchange, .. } | ExchangeOutcome::Unavailable { exchange, .. } => {
                exchange.as_str()
            }
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ExchangeOutcome::Unavailable { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniverseOrigin {
    Cache,
    Refreshed,
}

/// The resolved universe plus how it was obtained.
#[derive(Debug, Clone)]
pub struct UniverseReport {
    pub universe: SymbolUniverse,
    pub origin: UniverseOrigin,
    /// Per-exchange results; empty when served from cache.
    pub outcomes: Vec<ExchangeOutcome>,
    /// Exchanges missing from the universe, from this refresh or the cache.
    pub failed_exchanges: Vec<String>,
}

impl UniverseReport {
    pub fn is_degraded(&self) -> bool {
        !self.failed_exchanges.is_empty()
    }
}

/// Resolve the symbol universe for `exchanges`, refreshing the cache if needed.
pub async fn load_or_refresh<S>(
    source: &S,
    store: &ArtifactStore,
    exchanges: &[String],
    ttl_days: i64,
    now: DateTime<Utc>,
) -> Result<UniverseReport, CacheError>
where
    S: MarketDataSource + ?Sized,
{
    if let Some(cached) = symbol_universe::load(store, now).await? {
        let ttl = Duration::try_days(ttl_days).unwrap_or(Duration::MAX);
        let fresh = cached.age < ttl;
        let same_exchanges = exchange_set(&cached.document.meta.exchanges) == exchange_set(exchanges);
        if fresh && same_exchanges {
            info!(
                "Using cached symbol universe ({} symbols, {}h old)",
                cached.document.symbols.len(),
                cached.age.num_hours()
            );
            return Ok(UniverseReport {
                universe: cached.document.symbols.into_iter().collect(),
                origin: UniverseOrigin::Cache,
                outcomes: Vec::new(),
                failed_exchanges: cached.document.meta.failed_exchanges,
            });
        }
        info!(
            "Symbol cache stale or built for other exchanges (fresh={}, same exchanges={}); refreshing",
            fresh, same_exchanges
        );
    }

    let (universe, outcomes) = fetch_universe(source, exchanges).await;
    let failed_exchanges: Vec<String> = outcomes
        .iter()
        .filter(|o| o.is_unavailable())
        .map(|o| o.exchange().to_string())
        .collect();

    let document = SymbolCacheDocument {
        meta: SymbolCacheMeta {
            exchanges: exchanges.to_vec(),
            generated_utc: now,
            failed_exchanges: failed_exchanges.clone(),
        },
        symbols: universe.to_sorted_vec(),
    };
    symbol_universe::save(store, &document).await?;

    info!(
        "Symbol universe refreshed: {} symbols from {} exchange(s), {} unavailable",
        universe.len(),
        outcomes.len(),
        failed_exchanges.len()
    );

    Ok(UniverseReport {
        universe,
        origin: UniverseOrigin::Refreshed,
        outcomes,
        failed_exchanges,
    })
}

/// Query each exchange in turn, keeping equity symbols only.
pub async fn fetch_universe<S>(
    source: &S,
    exchanges: &[String],
) -> (SymbolUniverse, Vec<ExchangeOutcome>)
where
    S: MarketDataSource + ?Sized,
{
    let mut symbols = BTreeSet::new();
    let mut outcomes = Vec::with_capacity(exchanges.len());

    for exchange in exchanges.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        match source.exchange_symbols(exchange).await {
            Ok(listings) => {
                let before = symbols.len();
                symbols.extend(
                    listings
                        .iter()
                        .filter(|l| !l.is_fund_like())
                        .filter_map(|l| l.ticker())
                        .map(str::to_string),
                );
                outcomes.push(ExchangeOutcome::Loaded {
                    exchange: exchange.to_string(),
                    symbols: symbols.len() - before,
                });
            }
            Err(e) => {
                warn!("Symbol fetch failed for {}: {}", exchange, e);
                outcomes.push(ExchangeOutcome::Unavailable {
                    exchange: exchange.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (symbols.into_iter().collect(), outcomes)
}

fn exchange_set(exchanges: &[String]) -> BTreeSet<&str> {
    exchanges
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio::sync::Mutex;

    use crate::models::{RawEvent, SymbolListing};
    use crate::service::caching::Artifact;
    use crate::service::finance::FinanceServiceError;

    #[derive(Default)]
    struct MockListings {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MarketDataSource for MockListings {
        async fn earnings_calendar(
            &self,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<RawEvent>, FinanceServiceError> {
            Ok(Vec::new())
        }

        async fn exchange_symbols(
            &self,
            exchange: &str,
        ) -> Result<Vec<SymbolListing>, FinanceServiceError> {
            self.calls.lock().await.push(exchange.to_string());
            match exchange {
                "US" => Ok(vec![
                    SymbolListing::new("AAPL", "Common Stock"),
                    SymbolListing::new("SPY", "ETP"),
                    SymbolListing::new("QQQ", "ETF"),
                    SymbolListing::new("VFIAX", "Mutual Fund"),
                    SymbolListing::new(" MSFT ", "Common Stock"),
                    SymbolListing::new("", "Common Stock"),
                ]),
                "DE" => Ok(vec![
                    SymbolListing::new("SAP.DE", "Common Stock"),
                    SymbolListing::new("AAPL", "Common Stock"),
                ]),
                other => Err(FinanceServiceError::Http(format!("{other} unreachable"))),
            }
        }
    }

    fn exchanges(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn refresh_filters_funds_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let mock = MockListings::default();

        let report = load_or_refresh(&mock, &store, &exchanges(&["US", "DE"]), 7, Utc::now())
            .await
            .unwrap();

        assert_eq!(report.origin, UniverseOrigin::Refreshed);
        assert_eq!(report.universe.to_sorted_vec(), vec!["AAPL", "MSFT", "SAP.DE"]);
        assert!(!report.is_degraded());
        assert_eq!(
            report.outcomes[1],
            ExchangeOutcome::Loaded {
                exchange: "DE".into(),
                symbols: 1
            }
        );
        assert!(store.read(Artifact::SymbolUniverse).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failing_exchange_degrades_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let mock = MockListings::default();

        let report = load_or_refresh(&mock, &store, &exchanges(&["US", "LSE", "DE"]), 7, Utc::now())
            .await
            .unwrap();

        assert_eq!(report.universe.len(), 3);
        assert_eq!(report.failed_exchanges, vec!["LSE"]);
        assert!(report.outcomes[1].is_unavailable());

        let cached = symbol_universe::load(&store, Utc::now()).await.unwrap().unwrap();
        assert_eq!(cached.document.meta.failed_exchanges, vec!["LSE"]);
    }

    #[tokio::test]
    async fn fresh_cache_with_same_exchanges_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let mock = MockListings::default();
        let now = Utc::now();

        load_or_refresh(&mock, &store, &exchanges(&["US", "DE"]), 7, now)
            .await
            .unwrap();
        let report = load_or_refresh(&mock, &store, &exchanges(&["DE", "US"]), 7, now + Duration::days(6))
            .await
            .unwrap();

        assert_eq!(report.origin, UniverseOrigin::Cache);
        assert_eq!(report.universe.len(), 3);
        assert_eq!(mock.calls.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn out_of_range_ttl_reuses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let mock = MockListings::default();
        let now = Utc::now();

        load_or_refresh(&mock, &store, &exchanges(&["US"]), 7, now)
            .await
            .unwrap();
        let report = load_or_refresh(&mock, &store, &exchanges(&["US"]), i64::MAX, now + Duration::days(400))
            .await
            .unwrap();

        assert_eq!(report.origin, UniverseOrigin::Cache);
        assert_eq!(mock.calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn stale_or_changed_exchange_list_refreshes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let mock = MockListings::default();
        let now = Utc::now();

        load_or_refresh(&mock, &store, &exchanges(&["US"]), 7, now)
            .await
            .unwrap();

        let changed = load_or_refresh(&mock, &store, &exchanges(&["US", "DE"]), 7, now)
            .await
            .unwrap();
        assert_eq!(changed.origin, UniverseOrigin::Refreshed);

        let stale = load_or_refresh(&mock, &store, &exchanges(&["US", "DE"]), 7, now + Duration::days(8))
            .await
            .unwrap();
        assert_eq!(stale.origin, UniverseOrigin::Refreshed);
        assert_eq!(mock.calls.lock().await.len(), 5);
    }
}
