//! Map-backed rate store with nearest-date lookup.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::ports::{RateStore, RateStoreError};
use crate::domain::{CurrencyCode, Rate};

type RateHistory = BTreeMap<NaiveDate, Rate>;

/// In-memory `RateStore`.
///
/// Each currency keeps an ordered history. A lookup answers with the exact
/// date when present, otherwise the nearest later date, otherwise the
/// nearest earlier date.
#[derive(Debug, Default)]
pub struct InMemoryRateStore {
    histories: RwLock<HashMap<CurrencyCode, RateHistory>>,
}

impl InMemoryRateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn get(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Rate>, RateStoreError> {
        let histories = self.histories.read().unwrap_or_else(PoisonError::into_inner);
        let Some(history) = histories.get(currency) else {
            return Ok(None);
        };
        let nearest = history
            .range(date..)
            .next()
            .or_else(|| history.range(..date).next_back())
            .map(|(_, rate)| *rate);
        Ok(nearest)
    }

    async fn add(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
        rate: Rate,
    ) -> Result<(), RateStoreError> {
        self.histories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(currency.clone())
            .or_default()
            .insert(date, rate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).expect("valid date")
    }

    fn rate(raw: i64) -> Rate {
        Rate::from_fixed(raw).expect("positive rate")
    }

    #[fixture]
    fn eur() -> CurrencyCode {
        CurrencyCode::new("EUR").expect("code")
    }

    async fn seeded(eur: &CurrencyCode) -> InMemoryRateStore {
        let store = InMemoryRateStore::new();
        for (d, raw) in [(5, 105), (10, 110), (20, 120)] {
            store.add(eur, day(d), rate(raw)).await.expect("add");
        }
        store
    }

    #[rstest]
    #[case::exact(10, 110)]
    #[case::next_available(11, 120)]
    #[case::before_history(1, 105)]
    #[case::after_history(25, 120)]
    #[tokio::test]
    async fn resolves_nearest_rate(eur: CurrencyCode, #[case] d: u32, #[case] expected: i64) {
        let store = seeded(&eur).await;

        let found = store.get(&eur, day(d)).await.expect("lookup");

        assert_eq!(found, Some(rate(expected)));
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_currency_has_no_rate(eur: CurrencyCode) {
        let store = seeded(&eur).await;
        let usd = CurrencyCode::new("USD").expect("code");

        assert_eq!(store.get(&usd, day(10)).await.expect("lookup"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn add_replaces_rate_for_same_day(eur: CurrencyCode) {
        let store = seeded(&eur).await;

        store.add(&eur, day(10), rate(999)).await.expect("add");

        assert_eq!(store.get(&eur, day(10)).await.expect("lookup"), Some(rate(999)));
    }
}
