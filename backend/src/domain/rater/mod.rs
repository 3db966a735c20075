//! Exchange engine: rate refresh scheduling and currency conversion.
//!
//! The engine owns a reader/writer gate around the current [`RateTable`].
//! A refresh holds the write side for its whole duration (clearing the
//! readiness flag, persisting every rate, replacing the table), so readers
//! never observe a half-applied refresh. Readers check out the read side
//! with [`Rater::try_acquire_exchange`], which never waits: failing to
//! acquire means "rates are not ready yet", not an error.
//!
//! Batch callers acquire one [`ExchangePermit`] for the whole batch and run
//! every conversion through it, so a report never mixes rates from two
//! refresh cycles. Dropping the permit releases the gate.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{RwLock, RwLockReadGuard};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::ports::{RateSource, RateSourceError, RateStore, RateTable};
use crate::domain::{Amount, CurrencyCode, ExchangeError, Rate};

/// Default period between rate refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Exchange engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaterConfig {
    /// Currency every stored rate is relative to.
    pub base_currency: CurrencyCode,
    /// Period between refreshes.
    pub refresh_interval: Duration,
}

impl RaterConfig {
    /// Configuration with the default refresh interval.
    pub fn new(base_currency: CurrencyCode) -> Self {
        Self {
            base_currency,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Override the refresh interval.
    #[must_use]
    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }
}

/// Outcome of one successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Date of the fetched table.
    pub date: NaiveDate,
    /// Rates written to the store.
    pub persisted: usize,
    /// Rates the store refused.
    pub failed: usize,
}

/// Exchange engine.
pub struct Rater {
    source: Arc<dyn RateSource>,
    store: Arc<dyn RateStore>,
    table: RwLock<RateTable>,
    ready: AtomicBool,
    config: RaterConfig,
}

impl Rater {
    /// Build an engine with an empty rate table.
    pub fn new(
        source: Arc<dyn RateSource>,
        store: Arc<dyn RateStore>,
        config: RaterConfig,
    ) -> Self {
        Self {
            source,
            store,
            table: RwLock::new(RateTable::default()),
            ready: AtomicBool::new(true),
            config,
        }
    }

    /// Currency every rate is expressed against.
    pub fn base_currency(&self) -> &CurrencyCode {
        &self.config.base_currency
    }

    /// Fetch a fresh table and apply it atomically.
    ///
    /// A failed fetch leaves the current table and the store untouched. Store
    /// write failures are logged and counted; the cycle still completes so
    /// readers are released.
    ///
    /// # Errors
    ///
    /// Returns the source error when the table could not be fetched.
    pub async fn refresh(&self) -> Result<RefreshSummary, RateSourceError> {
        let fresh = match self.source.fetch_rates().await {
            Ok(table) => table,
            Err(error) => {
                warn!(%error, "rate refresh failed; keeping current rates");
                return Err(error);
            }
        };

        let mut table = self.table.write().await;
        let _reset = ReadyReset::clear(&self.ready);

        let mut summary = RefreshSummary {
            date: fresh.date,
            persisted: 0,
            failed: 0,
        };
        for (currency, rate) in &fresh.rates {
            if *currency == self.config.base_currency {
                continue;
            }
            match self.store.add(currency, fresh.date, *rate).await {
                Ok(()) => summary.persisted += 1,
                Err(error) => {
                    summary.failed += 1;
                    warn!(%currency, date = %fresh.date, %error, "failed to persist rate");
                }
            }
        }
        *table = fresh;
        Ok(summary)
    }

    /// Check out the shared side of the gate without waiting.
    ///
    /// Returns `None` while a refresh is in progress. The permit must be held
    /// for the whole conversion batch.
    pub fn try_acquire_exchange(&self) -> Option<ExchangePermit<'_>> {
        let table = self.table.try_read().ok()?;
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }
        Some(ExchangePermit { rater: self, table })
    }

    /// Whether conversions can currently proceed.
    pub fn is_ready(&self) -> bool {
        self.try_acquire_exchange().is_some()
    }

    /// Snapshot of the most recent table, or `None` while refreshing.
    pub fn latest_rates(&self) -> Option<RateTable> {
        self.try_acquire_exchange()
            .map(|permit| permit.rates().clone())
    }

    /// Convert `amount` from one currency to another at `date`.
    ///
    /// Equal currencies short-circuit without touching rates. Otherwise the
    /// value pivots through the base currency as `amount * from / to` with
    /// truncating integer division. Callers converting on behalf of a report
    /// hold an [`ExchangePermit`] for the duration.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::CannotExchange`] when either currency has no
    /// known rate, [`ExchangeError::Overflow`] when the result does not fit,
    /// and [`ExchangeError::Store`] when the lookup itself fails.
    pub async fn exchange(
        &self,
        amount: Amount,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Amount, ExchangeError> {
        if from == to {
            return Ok(amount);
        }
        let from_rate = self.rate_for(from, date).await?;
        let to_rate = self.rate_for(to, date).await?;

        let converted = i128::from(amount.fixed()) * i128::from(from_rate.fixed())
            / i128::from(to_rate.fixed());
        i64::try_from(converted)
            .map(Amount::from_fixed)
            .map_err(|_| ExchangeError::Overflow {
                amount: amount.fixed(),
                from: from.clone(),
                to: to.clone(),
            })
    }

    async fn rate_for(&self, currency: &CurrencyCode, date: NaiveDate) -> Result<Rate, ExchangeError> {
        if *currency == self.config.base_currency {
            return Ok(Rate::UNIT);
        }
        self.store
            .get(currency, date)
            .await?
            .ok_or_else(|| ExchangeError::CannotExchange {
                currency: currency.clone(),
                date,
            })
    }

    /// Refresh on a fixed interval until `shutdown` resolves.
    ///
    /// The first refresh runs immediately. A refresh in progress is allowed
    /// to finish before shutdown is observed.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("rate refresh loop stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Ok(summary) = self.refresh().await {
                        info!(
                            date = %summary.date,
                            persisted = summary.persisted,
                            failed = summary.failed,
                            "exchange rates refreshed"
                        );
                    } else {
                        debug!("next refresh scheduled after failure");
                    }
                }
            }
        }
    }
}

/// Shared checkout of the exchange gate.
///
/// Holding a permit blocks refreshes; dropping it releases the gate.
pub struct ExchangePermit<'a> {
    rater: &'a Rater,
    table: RwLockReadGuard<'a, RateTable>,
}

impl ExchangePermit<'_> {
    /// Convert under this permit. See [`Rater::exchange`].
    ///
    /// # Errors
    ///
    /// Propagates [`ExchangeError`] from the engine.
    pub async fn exchange(
        &self,
        amount: Amount,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Amount, ExchangeError> {
        self.rater.exchange(amount, from, to, date).await
    }

    /// Table that was current when the permit was acquired.
    pub fn rates(&self) -> &RateTable {
        &self.table
    }
}

/// Clears the readiness flag and restores it when dropped, including when a
/// refresh future is cancelled mid-update.
struct ReadyReset<'a>(&'a AtomicBool);

impl<'a> ReadyReset<'a> {
    fn clear(flag: &'a AtomicBool) -> Self {
        flag.store(false, Ordering::Release);
        Self(flag)
    }
}

impl Drop for ReadyReset<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests;
