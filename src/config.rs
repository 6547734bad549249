use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://finnhub.io/api/v1";
pub const DEFAULT_EXCHANGES: &str = "US,DE,PA,LSE,AS,MI,MC,STO,SWX";
pub const DEFAULT_OUTPUT_DIR: &str = "docs";

/// Upper bound for the look-back and look-ahead windows (about ten years).
pub const MAX_WINDOW_DAYS: i64 = 3_660;
/// Upper bound for the earnings freshness window (about a century).
pub const MAX_EARNINGS_TTL_HOURS: i64 = 876_000;
/// Upper bound for the symbol cache staleness window (about a century).
pub const MAX_SYMBOLS_TTL_DAYS: i64 = 36_500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

/// Settings for one indexing run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub api_token: String,
    pub api_base: String,
    pub earnings_ttl_hours: i64,
    pub days_ahead: i64,
    pub days_back: i64,
    pub exchanges: Vec<String>,
    pub symbols_ttl_days: i64,
    pub request_timeout: Duration,
    /// Calendar sub-ranges requested at once; 1 keeps the fetch sequential.
    pub fetch_concurrency: usize,
    pub output_dir: PathBuf,
}

impl IndexerConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup("FINNHUB_TOKEN")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("FINNHUB_TOKEN"))?;

        let exchanges = parse_exchanges(
            &lookup("FINNHUB_EXCHANGES").unwrap_or_else(|| DEFAULT_EXCHANGES.to_string()),
        );

        let api_base = lookup("FINNHUB_API_BASE")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let output_dir = lookup("EARNINGS_OUTPUT_DIR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

        let timeout_secs: u64 = parse_or(&lookup, "FINNHUB_TIMEOUT_SECS", 60);
        let concurrency: usize = parse_or(&lookup, "FINNHUB_FETCH_CONCURRENCY", 1);

        Ok(Self {
            api_token,
            api_base,
            earnings_ttl_hours: parse_clamped(
                &lookup,
                "FINNHUB_EARNINGS_TTL_HOURS",
                24,
                MAX_EARNINGS_TTL_HOURS,
            ),
            days_ahead: parse_clamped(&lookup, "FINNHUB_DAYS_AHEAD", 365, MAX_WINDOW_DAYS),
            days_back: parse_clamped(&lookup, "FINNHUB_DAYS_BACK", 7, MAX_WINDOW_DAYS),
            exchanges,
            symbols_ttl_days: parse_clamped(
                &lookup,
                "FINNHUB_SYMBOLS_TTL_DAYS",
                7,
                MAX_SYMBOLS_TTL_DAYS,
            ),
            request_timeout: Duration::from_secs(timeout_secs),
            fetch_concurrency: concurrency.max(1),
            output_dir: PathBuf::from(output_dir),
        })
    }
}

/// Split a comma-separated exchange list, dropping blanks.
pub fn parse_exchanges(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a non-negative count, pinning it into `0..=max`.
fn parse_clamped<F>(lookup: &F, key: &str, default: i64, max: i64) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default).clamp(0, max)
}
