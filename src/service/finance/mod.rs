use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use crate::config::IndexerConfig;
use crate::models::{RawEvent, SymbolListing};

pub mod earnings;
pub mod symbols;

#[derive(Debug, thiserror::Error)]
pub enum FinanceServiceError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("api status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("parse failed: {0}")]
    Parse(String),
}

/// Upstream provider of calendar rows and exchange symbol listings.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Raw calendar rows for the inclusive date range.
    async fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawEvent>, FinanceServiceError>;

    /// Every listed instrument on one exchange.
    async fn exchange_symbols(
        &self,
        exchange: &str,
    ) -> Result<Vec<SymbolListing>, FinanceServiceError>;
}

/// Finnhub REST client.
pub struct FinnhubClient {
    http: Client,
    base_url: String,
    token: String,
}

impl FinnhubClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FinanceServiceError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("earnings-index/finnhub")
            .build()
            .map_err(|e| FinanceServiceError::Http(format!("failed to build client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &IndexerConfig) -> Result<Self, FinanceServiceError> {
        Self::new(
            config.api_base.clone(),
            config.api_token.clone(),
            config.request_timeout,
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl MarketDataSource for FinnhubClient {
    async fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawEvent>, FinanceServiceError> {
        earnings::fetch_earnings_range(self, from, to).await
    }

    async fn exchange_symbols(
        &self,
        exchange: &str,
    ) -> Result<Vec<SymbolListing>, FinanceServiceError> {
        symbols::fetch_exchange_symbols(self, exchange).await
    }
}

/// GET `path` with `query` plus the access token, returning the raw body.
async fn get_bytes(
    client: &FinnhubClient,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Vec<u8>, FinanceServiceError> {
    let resp = client
        .http
        .get(client.endpoint(path))
        .query(query)
        .query(&[("token", client.token.as_str())])
        .send()
        .await
        .map_err(|e| FinanceServiceError::Http(e.without_url().to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "unable to read body".to_string());
        return Err(FinanceServiceError::Status {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FinanceServiceError::Http(format!("body read failed: {}", e.without_url())))?;
    Ok(bytes.to_vec())
}

fn parse_preview(raw: &[u8], err: serde_json::Error) -> FinanceServiceError {
    let preview = String::from_utf8_lossy(&raw[..raw.len().min(200)]);
    FinanceServiceError::Parse(format!("{err}; body preview: {preview}"))
}

pub use FinanceServiceError as Error;
