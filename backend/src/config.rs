//! Service configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `SPENDBOT_*` environment variables and
//! configuration files. Optional fields fall back to the defaults exposed by
//! the accessors.

use std::num::NonZeroUsize;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{
    CurrencyCode, DEFAULT_REFRESH_INTERVAL, DEFAULT_REPORT_TIMEOUT, MoneyValidationError,
};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BASE_CURRENCY: &str = "RUB";
const DEFAULT_RATES_URL: &str = "https://www.cbr-xml-daily.ru/daily_json.js";
const DEFAULT_RATES_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_QUEUE_PARTITIONS: usize = 8;
const DEFAULT_QUEUE_CONSUMERS: usize = 4;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Queue implementation carrying report requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    /// Partitioned in-process channels.
    Memory,
    /// Durable PostgreSQL table.
    Postgres,
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Unknown queue backend name.
    #[error("unknown queue backend {0:?}; expected `memory` or `postgres`")]
    UnknownQueueBackend(String),
    /// The PostgreSQL backend needs a database URL.
    #[error("queue backend `postgres` requires `database_url`")]
    MissingDatabaseUrl,
    /// The base currency is not a currency code.
    #[error("invalid base currency: {0}")]
    BaseCurrency(#[from] MoneyValidationError),
    /// A count that must be positive was zero.
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

/// Configuration values for the report service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SPENDBOT")]
pub struct ServiceSettings {
    /// Socket address the HTTP server binds to.
    pub listen_addr: Option<String>,
    /// Seconds a report query waits for its reply.
    pub report_timeout_secs: Option<u64>,
    /// Seconds between exchange rate refreshes.
    pub refresh_interval_secs: Option<u64>,
    /// Currency every rate is expressed against.
    pub base_currency: Option<String>,
    /// Daily rates document URL.
    pub rates_url: Option<String>,
    /// Seconds before a rates fetch is abandoned.
    pub rates_timeout_secs: Option<u64>,
    /// `memory` or `postgres`.
    pub queue_backend: Option<String>,
    /// PostgreSQL connection string for the durable queue.
    pub database_url: Option<String>,
    /// Number of in-memory queue partitions.
    pub queue_partitions: Option<usize>,
    /// Concurrent claimers polling the PostgreSQL queue.
    pub queue_consumers: Option<usize>,
    /// Milliseconds between polls of an empty PostgreSQL queue.
    pub queue_poll_interval_ms: Option<u64>,
    /// Reply listener URL; when absent results are routed in-process.
    pub callback_url: Option<String>,
    /// Reply immediately with "not ready" instead of dropping requests
    /// received while rates refresh.
    #[ortho_config(default = false)]
    pub reply_when_not_ready: bool,
}

impl ServiceSettings {
    /// Return the listen address, falling back to the default.
    pub fn listen_addr(&self) -> &str {
        self.listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR)
    }

    /// Return the report wait bound.
    pub fn report_timeout(&self) -> Duration {
        self.report_timeout_secs
            .map_or(DEFAULT_REPORT_TIMEOUT, Duration::from_secs)
    }

    /// Return the refresh period.
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval_secs
            .map_or(DEFAULT_REFRESH_INTERVAL, Duration::from_secs)
    }

    /// Return the validated base currency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BaseCurrency`] for malformed codes.
    pub fn base_currency(&self) -> Result<CurrencyCode, ConfigError> {
        Ok(CurrencyCode::new(
            self.base_currency.as_deref().unwrap_or(DEFAULT_BASE_CURRENCY),
        )?)
    }

    /// Return the rates document URL.
    pub fn rates_url(&self) -> &str {
        self.rates_url.as_deref().unwrap_or(DEFAULT_RATES_URL)
    }

    /// Return the rates fetch timeout.
    pub fn rates_timeout(&self) -> Duration {
        self.rates_timeout_secs
            .map_or(DEFAULT_RATES_TIMEOUT, Duration::from_secs)
    }

    /// Return the callback request timeout.
    pub fn callback_timeout(&self) -> Duration {
        DEFAULT_CALLBACK_TIMEOUT
    }

    /// Return the selected queue backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownQueueBackend`] for unrecognised names and
    /// [`ConfigError::MissingDatabaseUrl`] when `postgres` lacks a URL.
    pub fn queue_backend(&self) -> Result<QueueBackend, ConfigError> {
        let backend = match self.queue_backend.as_deref().map(str::trim) {
            None | Some("memory") => QueueBackend::Memory,
            Some("postgres") => QueueBackend::Postgres,
            Some(other) => return Err(ConfigError::UnknownQueueBackend(other.to_owned())),
        };
        if backend == QueueBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        Ok(backend)
    }

    /// Return the in-memory partition count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] when configured as zero.
    pub fn queue_partitions(&self) -> Result<NonZeroUsize, ConfigError> {
        let count = self.queue_partitions.unwrap_or(DEFAULT_QUEUE_PARTITIONS);
        NonZeroUsize::new(count).ok_or(ConfigError::Zero("queue_partitions"))
    }

    /// Return the PostgreSQL claimer count.
    pub fn queue_consumers(&self) -> usize {
        self.queue_consumers.unwrap_or(DEFAULT_QUEUE_CONSUMERS).max(1)
    }

    /// Return the idle poll interval of the PostgreSQL queue.
    pub fn queue_poll_interval(&self) -> Duration {
        self.queue_poll_interval_ms
            .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis)
    }
}
