use std::fmt;

use chrono::{Datelike, Months, NaiveDate};

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from.format("%Y-%m-%d"), self.to.format("%Y-%m-%d"))
    }
}

/// Split `[start, end]` into per-month windows clipped to the outer bounds.
///
/// Windows are ordered, gap-free and non-overlapping. An inverted range
/// yields no windows.
pub fn month_ranges(start: NaiveDate, end: NaiveDate) -> Vec<DateRange> {
    let mut out = Vec::new();
    let mut cursor = start;

    while cursor <= end {
        let to = last_day_of_month(cursor).min(end);
        out.push(DateRange::new(cursor, to));
        match to.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }

    out
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next_first| next_first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
