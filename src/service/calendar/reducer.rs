use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::models::{EarningsIndex, EarningsRecord, RawEvent, SymbolUniverse, TimeFlag};

/// Row counts observed while reducing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceStats {
    pub rows_total: usize,
    /// Rows with a symbol that passed the universe filter.
    pub rows_after_filter: usize,
    pub malformed: usize,
    pub outside_universe: usize,
    pub past: usize,
}

#[derive(Debug, Clone)]
pub struct Reduction {
    pub index: EarningsIndex,
    pub stats: ReduceStats,
}

/// Running "earliest event" state for one symbol.
#[derive(Debug, Clone, Copy)]
struct SymbolAccumulator {
    earliest: NaiveDate,
    time: TimeFlag,
    same_day: usize,
}

impl SymbolAccumulator {
    fn new(date: NaiveDate, time: TimeFlag) -> Self {
        Self {
            earliest: date,
            time,
            same_day: 1,
        }
    }

    /// Only a strictly earlier date replaces the held row, so the first row
    /// seen on the earliest date keeps its time flag.
    fn observe(&mut self, date: NaiveDate, time: TimeFlag) {
        if date < self.earliest {
            *self = Self::new(date, time);
        } else if date == self.earliest {
            self.same_day += 1;
        }
    }

    fn into_record(self, symbol: String, stamped: DateTime<Utc>) -> EarningsRecord {
        EarningsRecord {
            source_row_count: self.same_day,
            last_updated: stamped,
            next_earnings_date: self.earliest,
            symbol,
            time: self.time,
        }
    }
}

/// Collapse raw calendar rows into one upcoming-earnings record per symbol.
///
/// Rows are consumed in the given order. Rows without a symbol or a valid
/// `YYYY-MM-DD` date, rows outside `universe` (when supplied) and rows dated
/// before `now`'s calendar day are dropped. Every record is stamped with `now`.
pub fn reduce(
    rows: &[RawEvent],
    universe: Option<&SymbolUniverse>,
    now: DateTime<Utc>,
) -> Reduction {
    let today = now.date_naive();
    let mut stats = ReduceStats {
        rows_total: rows.len(),
        ..Default::default()
    };
    let mut groups: BTreeMap<&str, SymbolAccumulator> = BTreeMap::new();

    for row in rows {
        let Some(symbol) = row.symbol.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            stats.malformed += 1;
            continue;
        };
        if universe.is_some_and(|u| !u.contains(symbol)) {
            stats.outside_universe += 1;
            continue;
        }
        stats.rows_after_filter += 1;

        let Some(date) = row
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        else {
            stats.malformed += 1;
            continue;
        };
        if date < today {
            stats.past += 1;
            continue;
        }

        let time = TimeFlag::normalize(row.time_of_day());
        groups
            .entry(symbol)
            .and_modify(|acc| acc.observe(date, time))
            .or_insert_with(|| SymbolAccumulator::new(date, time));
    }

    let index: EarningsIndex = groups
        .into_iter()
        .map(|(symbol, acc)| (symbol.to_string(), acc.into_record(symbol.to_string(), now)))
        .collect();

    debug!(
        "Reduced {} rows to {} symbols (malformed {}, outside universe {}, past {})",
        stats.rows_total,
        index.len(),
        stats.malformed,
        stats.outside_universe,
        stats.past
    );

    Reduction { index, stats }
}

/// Deterministic JSON rendering of an index: sorted keys, two-space indent.
pub fn to_canonical_json(index: &EarningsIndex) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 6, 0, 0).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn picks_earliest_date_and_first_flag() {
        let rows = vec![
            RawEvent::new("AAPL", "2025-03-10", Some("bmo")),
            RawEvent::new("AAPL", "2025-03-10", Some("amc")),
            RawEvent::new("AAPL", "2025-04-01", Some("bmo")),
        ];

        let out = reduce(&rows, None, at(2025, 1, 1));
        assert_eq!(out.index.len(), 1);
        let aapl = &out.index["AAPL"];
        assert_eq!(aapl.next_earnings_date, date("2025-03-10"));
        assert_eq!(aapl.time, TimeFlag::Bmo);
        assert_eq!(aapl.source_row_count, 2);
        assert_eq!(aapl.last_updated, at(2025, 1, 1));
    }

    #[test]
    fn earlier_row_later_in_input_resets_the_tie_break() {
        let rows = vec![
            RawEvent::new("MSFT", "2025-05-02", Some("bmo")),
            RawEvent::new("MSFT", "2025-04-20", None),
            RawEvent::new("MSFT", "2025-04-20", Some("amc")),
            RawEvent::new("MSFT", "2025-05-02", Some("bmo")),
        ];

        let out = reduce(&rows, None, at(2025, 1, 1));
        let msft = &out.index["MSFT"];
        assert_eq!(msft.next_earnings_date, date("2025-04-20"));
        assert_eq!(msft.time, TimeFlag::Tbd);
        assert_eq!(msft.source_row_count, 2);
    }

    #[test]
    fn drops_past_rows_but_keeps_today() {
        let rows = vec![
            RawEvent::new("IBM", "2024-12-31", Some("bmo")),
            RawEvent::new("IBM", "2025-01-01", Some("amc")),
            RawEvent::new("OLD", "2024-12-01", Some("amc")),
        ];

        let out = reduce(&rows, None, at(2025, 1, 1));
        assert_eq!(out.index.len(), 1);
        assert_eq!(out.index["IBM"].next_earnings_date, date("2025-01-01"));
        assert_eq!(out.index["IBM"].time, TimeFlag::Amc);
        assert_eq!(out.stats.past, 2);
    }

    #[test]
    fn drops_malformed_rows_silently() {
        let rows = vec![
            RawEvent {
                symbol: None,
                date: Some("2025-03-10".into()),
                ..Default::default()
            },
            RawEvent::new("   ", "2025-03-10", None),
            RawEvent {
                symbol: Some("AAPL".into()),
                date: None,
                ..Default::default()
            },
            RawEvent::new("AAPL", "03/10/2025", None),
            RawEvent::new("AAPL", "2025-02-30", None),
            RawEvent::new(" AAPL ", "2025-03-11", Some("noon")),
        ];

        let out = reduce(&rows, None, at(2025, 1, 1));
        assert_eq!(out.stats.malformed, 5);
        assert_eq!(out.index.len(), 1);
        assert_eq!(out.index["AAPL"].symbol, "AAPL");
        assert_eq!(out.index["AAPL"].time, TimeFlag::Tbd);
    }

    #[test]
    fn universe_filter_applies_when_present() {
        let universe: SymbolUniverse = ["AAPL"].into_iter().collect();
        let rows = vec![
            RawEvent::new("AAPL", "2025-03-10", Some("bmo")),
            RawEvent::new("SPY", "2025-03-10", Some("bmo")),
            RawEvent::new("TSLA", "not-a-date", None),
        ];

        let filtered = reduce(&rows, Some(&universe), at(2025, 1, 1));
        assert_eq!(filtered.index.keys().collect::<Vec<_>>(), vec!["AAPL"]);
        assert_eq!(filtered.stats.outside_universe, 2);
        assert_eq!(filtered.stats.rows_after_filter, 1);

        let open = reduce(&rows, None, at(2025, 1, 1));
        assert_eq!(open.index.len(), 2);
        assert_eq!(open.stats.rows_after_filter, 3);
    }

    #[test]
    fn canonical_json_is_stable() {
        let rows = vec![
            RawEvent::new("MSFT", "2025-04-20", Some("amc")),
            RawEvent::new("AAPL", "2025-03-10", Some("BMO")),
            RawEvent::new("AAPL", "2025-03-10", Some("bmo")),
        ];
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();

        let first = to_canonical_json(&reduce(&rows, None, now).index).unwrap();
        let second = to_canonical_json(&reduce(&rows, None, now).index).unwrap();
        assert_eq!(first, second);

        let expected = r#"{
  "AAPL": {
    "finnhubCount": 2,
    "lastUpdatedUtc": "2025-01-01T06:00:00Z",
    "nextEarningsDate": "2025-03-10",
    "symbol": "AAPL",
    "time": "bmo"
  },
  "MSFT": {
    "finnhubCount": 1,
    "lastUpdatedUtc": "2025-01-01T06:00:00Z",
    "nextEarningsDate": "2025-04-20",
    "symbol": "MSFT",
    "time": "amc"
  }
}"#;
        assert_eq!(first, expected);
    }

    #[test]
    fn empty_index_renders_as_empty_object() {
        assert_eq!(to_canonical_json(&EarningsIndex::new()).unwrap(), "{}");
    }
}
