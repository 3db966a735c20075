//! Reqwest-backed report callback adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::domain::ReportResult;
use crate::domain::ports::{ReportCallback, ReportCallbackError};
use crate::domain::report_codec::ReportResultBody;

/// Callback POSTing results as JSON to the reply listener.
pub struct HttpReportCallback {
    client: Client,
    endpoint: Url,
}

impl HttpReportCallback {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ReportCallback for HttpReportCallback {
    async fn send_report(&self, result: &ReportResult) -> Result<(), ReportCallbackError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ReportResultBody::from(result))
            .send()
            .await
            .map_err(|error| ReportCallbackError::transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ReportCallbackError::rejected(
            status.as_u16(),
            body.trim().chars().take(160).collect::<String>(),
        ))
    }
}
