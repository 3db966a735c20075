//! Driven port persisting `(currency, date) -> rate` pairs.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::define_port_error;
use crate::domain::{CurrencyCode, Rate};

define_port_error! {
    /// Errors surfaced by rate persistence adapters.
    pub enum RateStoreError {
        /// The storage backend is unavailable.
        Unavailable { message: String } => "rate store unavailable: {message}",
        /// A query or write failed.
        Query { message: String } => "rate store query failed: {message}",
    }
}

/// Port for rate persistence.
///
/// Lookups prefer an exact date match. When the date is missing the store
/// answers with the nearest later date, then the nearest earlier date; the
/// exchange engine relies on the store for this fallback.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Look up the rate for `currency` nearest to `date`.
    async fn get(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Rate>, RateStoreError>;

    /// Record the rate for `currency` on `date`, replacing any previous value.
    async fn add(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
        rate: Rate,
    ) -> Result<(), RateStoreError>;
}
