use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One instrument from an exchange's symbol listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolListing {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>, // e.g. "Common Stock", "ETP", "ETF"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SymbolListing {
    pub fn new(symbol: &str, kind: &str) -> Self {
        Self {
            symbol: Some(symbol.to_string()),
            kind: Some(kind.to_string()),
            description: None,
        }
    }

    /// Trimmed symbol, or `None` when blank.
    pub fn ticker(&self) -> Option<&str> {
        self.symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// ETFs and funds are not part of the earnings universe.
    pub fn is_fund_like(&self) -> bool {
        let kind = self.kind.as_deref().unwrap_or_default().to_lowercase();
        kind.contains("etf") || kind.contains("fund")
    }
}

/// Deduplicated, sorted set of symbols eligible for the earnings index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolUniverse {
    symbols: BTreeSet<String>,
}

impl SymbolUniverse {
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn to_sorted_vec(&self) -> Vec<String> {
        self.symbols.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for SymbolUniverse {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().map(Into::into).collect(),
        }
    }
}
