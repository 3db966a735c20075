//! Driven port for fetching a complete table of exchange rates.
//!
//! The gateway always returns a whole table for one date; the exchange
//! engine replaces its view of the rates wholesale on every refresh.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::define_port_error;
use crate::domain::{CurrencyCode, Rate};

/// Rates for one date, relative to the base currency.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RateTable {
    /// Date the rates are valid for.
    pub date: NaiveDate,
    /// Price of one unit of each currency in the base currency.
    pub rates: BTreeMap<CurrencyCode, Rate>,
}

impl RateTable {
    /// Build a table for `date`.
    pub fn new(date: NaiveDate, rates: BTreeMap<CurrencyCode, Rate>) -> Self {
        Self { date, rates }
    }

    /// Number of currencies in the table.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the table holds no rates.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

define_port_error! {
    /// Errors surfaced while fetching rates from the external source.
    pub enum RateSourceError {
        /// Network transport failed before a response arrived.
        Transport { message: String } => "rate source transport failed: {message}",
        /// The source did not answer in time.
        Timeout { message: String } => "rate source timed out: {message}",
        /// The source answered with a non-success status.
        Status { status: u16, message: String } =>
            "rate source returned status {status}: {message}",
        /// The response body could not be decoded.
        Decode { message: String } => "rate source response decode failed: {message}",
    }
}

/// Port for the external rate provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch the latest full rate table.
    async fn fetch_rates(&self) -> Result<RateTable, RateSourceError>;
}
