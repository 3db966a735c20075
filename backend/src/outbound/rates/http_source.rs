//! Reqwest-backed rate source adapter.
//!
//! This adapter owns transport details only: timeout and HTTP error mapping,
//! and JSON decoding into a domain rate table.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::DailyRatesDto;
use crate::domain::ports::{RateSource, RateSourceError, RateTable};

const USER_AGENT: &str = concat!("spendbot-rates/", env!("CARGO_PKG_VERSION"));

/// Rate source performing HTTP GET requests against one endpoint.
pub struct RatesHttpSource {
    client: Client,
    endpoint: Url,
}

impl RatesHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl RateSource for RatesHttpSource {
    async fn fetch_rates(&self) -> Result<RateTable, RateSourceError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let table = parse_rates(body.as_ref())?;
        debug!(date = %table.date, currencies = table.len(), "rate table fetched");
        Ok(table)
    }
}

fn parse_rates(body: &[u8]) -> Result<RateTable, RateSourceError> {
    let decoded: DailyRatesDto = serde_json::from_slice(body).map_err(|error| {
        RateSourceError::decode(format!("invalid rates JSON payload: {error}"))
    })?;
    decoded.into_rate_table().map_err(RateSourceError::decode)
}

fn map_transport_error(error: reqwest::Error) -> RateSourceError {
    if error.is_timeout() {
        RateSourceError::timeout(error.to_string())
    } else {
        RateSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RateSourceError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RateSourceError::timeout(format!("status {}", status.as_u16()))
        }
        _ => RateSourceError::status(status.as_u16(), body_preview(body)),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
