//! Error taxonomy for currency exchange and report delivery.
//!
//! Report failures cross the RPC boundary as plain strings. The messages of
//! [`ExchangeError::CannotExchange`] and [`NOT_READY_MESSAGE`] are stable so
//! the bridge can restore the typed error on the caller's side.

use chrono::NaiveDate;

use super::CurrencyCode;
use super::ports::{RateStoreError, ReportQueueError};

/// Sentinel description for reports refused because rates are refreshing.
pub const NOT_READY_MESSAGE: &str = "exchange rates are not ready";

const CANNOT_EXCHANGE_PREFIX: &str = "cannot exchange";

/// Failures raised by a single currency conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// No rate is known for the currency around the requested date.
    #[error("cannot exchange {currency}: no rate known for {date}")]
    CannotExchange {
        /// Currency without a rate.
        currency: CurrencyCode,
        /// Date the rate was requested for.
        date: NaiveDate,
    },
    /// The converted value does not fit into an amount.
    #[error("cannot exchange {amount} {from} to {to}: result overflows")]
    Overflow {
        /// Source amount in fixed point.
        amount: i64,
        /// Source currency.
        from: CurrencyCode,
        /// Target currency.
        to: CurrencyCode,
    },
    /// The rate store failed while resolving a rate.
    #[error("rate lookup failed: {0}")]
    Store(#[from] RateStoreError),
}

/// Failures visible to callers of the report bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// Rates are being refreshed; retry after a short delay.
    #[error("exchange rates are not ready")]
    NotReady,
    /// A line item could not be converted into the requested currency.
    #[error("{message}")]
    CannotExchange {
        /// Description produced by the compute worker.
        message: String,
    },
    /// No reply arrived before the deadline.
    #[error("report request timed out")]
    Timeout,
    /// The request could not be published.
    #[error("failed to dispatch report request: {0}")]
    Dispatch(#[from] ReportQueueError),
    /// A newer request for the same user replaced this one.
    #[error("report request superseded by a newer request for the same user")]
    Superseded,
    /// The compute worker reported another failure.
    #[error("report computation failed: {message}")]
    Failed {
        /// Description produced by the compute worker.
        message: String,
    },
}

impl ReportError {
    /// Restore a typed error from the description carried by a failed result.
    ///
    /// # Examples
    /// ```
    /// use spendbot::domain::{NOT_READY_MESSAGE, ReportError};
    ///
    /// assert_eq!(ReportError::from_remote(NOT_READY_MESSAGE), ReportError::NotReady);
    /// ```
    pub fn from_remote(message: &str) -> Self {
        if message == NOT_READY_MESSAGE {
            Self::NotReady
        } else if message.starts_with(CANNOT_EXCHANGE_PREFIX) {
            Self::CannotExchange {
                message: message.to_owned(),
            }
        } else {
            Self::Failed {
                message: message.to_owned(),
            }
        }
    }
}
