//! Unit tests for the exchange engine.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use rstest::{fixture, rstest};
use tokio::sync::{Notify, mpsc};

use super::*;
use crate::domain::ports::{MockRateSource, MockRateStore, RateStoreError};

type RateKey = (CurrencyCode, NaiveDate);

/// Map-backed store that can park inside `add` until released.
#[derive(Default)]
struct GatedStore {
    rates: Mutex<BTreeMap<RateKey, Rate>>,
    adds: AtomicUsize,
    entered: Option<mpsc::UnboundedSender<()>>,
    release: Option<Arc<Notify>>,
    reject: Option<CurrencyCode>,
}

impl GatedStore {
    fn seeded(entries: &[(&str, NaiveDate, i64)]) -> Self {
        let store = Self::default();
        {
            let mut rates = store.rates.lock().expect("rates mutex");
            for (code, date, raw) in entries {
                rates.insert(
                    (code_of(code), *date),
                    Rate::from_fixed(*raw).expect("positive rate"),
                );
            }
        }
        store
    }

    fn gated(entered: mpsc::UnboundedSender<()>, release: Arc<Notify>) -> Self {
        Self {
            entered: Some(entered),
            release: Some(release),
            ..Self::default()
        }
    }
}

#[async_trait]
impl RateStore for GatedStore {
    async fn get(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Rate>, RateStoreError> {
        Ok(self
            .rates
            .lock()
            .expect("rates mutex")
            .get(&(currency.clone(), date))
            .copied())
    }

    async fn add(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
        rate: Rate,
    ) -> Result<(), RateStoreError> {
        self.adds.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(entered) = &self.entered {
            entered.send(()).expect("send entry");
        }
        if let Some(release) = &self.release {
            release.notified().await;
        }
        if self.reject.as_ref() == Some(currency) {
            return Err(RateStoreError::query("disk full"));
        }
        self.rates
            .lock()
            .expect("rates mutex")
            .insert((currency.clone(), date), rate);
        Ok(())
    }
}

fn code_of(raw: &str) -> CurrencyCode {
    CurrencyCode::new(raw).expect("valid code")
}

fn table(date: NaiveDate, entries: &[(&str, i64)]) -> RateTable {
    RateTable::new(
        date,
        entries
            .iter()
            .map(|(code, raw)| (code_of(code), Rate::from_fixed(*raw).expect("positive")))
            .collect(),
    )
}

fn source_returning(result: Result<RateTable, RateSourceError>) -> MockRateSource {
    let mut source = MockRateSource::new();
    source
        .expect_fetch_rates()
        .returning(move || result.clone());
    source
}

#[fixture]
fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 1).expect("valid date")
}

fn rater(source: impl RateSource + 'static, store: Arc<dyn RateStore>) -> Rater {
    Rater::new(Arc::new(source), store, RaterConfig::new(code_of("USD")))
}

#[rstest]
#[tokio::test]
async fn conversion_pivots_through_base_currency(day: NaiveDate) {
    let store = GatedStore::seeded(&[("XAA", day, 200), ("XBB", day, 400)]);
    let rater = rater(MockRateSource::new(), Arc::new(store));

    let converted = rater
        .exchange(Amount::from_fixed(1_500_000), &code_of("XAA"), &code_of("XBB"), day)
        .await
        .expect("both rates known");

    assert_eq!(converted, Amount::from_fixed(750_000));
}

#[rstest]
#[case("RUB", "USD", 1_000_000, 20_000)]
#[case("USD", "RUB", 20_000, 1_000_000)]
#[case("RUB", "USD", 3, 0)]
#[case("RUB", "USD", -1_000_000, -20_000)]
#[tokio::test]
async fn base_currency_uses_unit_rate(
    day: NaiveDate,
    #[case] from: &str,
    #[case] to: &str,
    #[case] amount: i64,
    #[case] expected: i64,
) {
    let store = GatedStore::seeded(&[("RUB", day, 200)]);
    let rater = rater(MockRateSource::new(), Arc::new(store));

    let converted = rater
        .exchange(Amount::from_fixed(amount), &code_of(from), &code_of(to), day)
        .await
        .expect("rate known");

    assert_eq!(converted, Amount::from_fixed(expected));
}

#[rstest]
#[tokio::test]
async fn missing_rate_cannot_be_exchanged(day: NaiveDate) {
    let rater = rater(MockRateSource::new(), Arc::new(GatedStore::default()));

    let err = rater
        .exchange(Amount::from_fixed(100), &code_of("EUR"), &code_of("USD"), day)
        .await
        .expect_err("no EUR rate");

    assert_eq!(
        err,
        ExchangeError::CannotExchange {
            currency: code_of("EUR"),
            date: day,
        }
    );
}

#[rstest]
#[tokio::test]
async fn store_failures_surface_as_store_errors(day: NaiveDate) {
    let mut store = MockRateStore::new();
    store
        .expect_get()
        .returning(|_, _| Err(RateStoreError::unavailable("connection reset")));
    let rater = rater(MockRateSource::new(), Arc::new(store));

    let err = rater
        .exchange(Amount::from_fixed(100), &code_of("EUR"), &code_of("USD"), day)
        .await
        .expect_err("store down");

    assert!(matches!(err, ExchangeError::Store(_)));
}

#[rstest]
#[tokio::test]
async fn overflowing_conversion_is_rejected(day: NaiveDate) {
    let store = GatedStore::seeded(&[("XAA", day, 1_000_000), ("XBB", day, 1)]);
    let rater = rater(MockRateSource::new(), Arc::new(store));

    let err = rater
        .exchange(Amount::from_fixed(i64::MAX), &code_of("XAA"), &code_of("XBB"), day)
        .await
        .expect_err("overflow");

    assert!(matches!(err, ExchangeError::Overflow { .. }));
}

#[rstest]
#[tokio::test]
async fn refresh_persists_rates_and_replaces_table(day: NaiveDate) {
    let store = Arc::new(GatedStore::default());
    let rater = rater(
        source_returning(Ok(table(day, &[("EUR", 11_000), ("RUB", 125), ("USD", 10_000)]))),
        store.clone(),
    );

    let summary = rater.refresh().await.expect("refresh succeeds");

    assert_eq!(
        summary,
        RefreshSummary {
            date: day,
            persisted: 2,
            failed: 0,
        }
    );
    let latest = rater.latest_rates().expect("ready after refresh");
    assert_eq!(latest.date, day);
    assert_eq!(latest.len(), 3);
    assert_eq!(
        store.get(&code_of("RUB"), day).await.expect("lookup"),
        Some(Rate::from_fixed(125).expect("positive"))
    );
}

#[rstest]
#[tokio::test]
async fn failed_fetch_keeps_current_table(day: NaiveDate) {
    let mut source = MockRateSource::new();
    let mut calls = 0;
    source.expect_fetch_rates().times(2).returning(move || {
        calls += 1;
        if calls == 1 {
            Ok(table(day, &[("EUR", 11_000)]))
        } else {
            Err(RateSourceError::timeout("30s elapsed"))
        }
    });
    let store = Arc::new(GatedStore::default());
    let rater = rater(source, store.clone());
    rater.refresh().await.expect("first refresh");

    let err = rater.refresh().await.expect_err("second refresh fails");

    assert!(matches!(err, RateSourceError::Timeout { .. }));
    assert!(rater.is_ready(), "failed fetch must not block readers");
    assert_eq!(rater.latest_rates(), Some(table(day, &[("EUR", 11_000)])));
    assert_eq!(store.adds.load(AtomicOrdering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn store_write_failures_are_counted(day: NaiveDate) {
    let store = Arc::new(GatedStore {
        reject: Some(code_of("EUR")),
        ..GatedStore::default()
    });
    let rater = rater(
        source_returning(Ok(table(day, &[("EUR", 11_000), ("RUB", 125)]))),
        store,
    );

    let summary = rater.refresh().await.expect("refresh completes");

    assert_eq!((summary.persisted, summary.failed), (1, 1));
    assert!(rater.is_ready());
}

#[rstest]
#[tokio::test]
async fn refresh_in_progress_blocks_exchange_checkout(day: NaiveDate) {
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    let release = Arc::new(Notify::new());
    let store = Arc::new(GatedStore::gated(entered_tx, release.clone()));
    let rater = Arc::new(rater(
        source_returning(Ok(table(day, &[("EUR", 11_000)]))),
        store,
    ));

    let refreshing = tokio::spawn({
        let rater = rater.clone();
        async move { rater.refresh().await }
    });
    entered_rx.recv().await.expect("refresh reached the store");

    assert!(rater.try_acquire_exchange().is_none());
    assert!(rater.latest_rates().is_none());

    release.notify_one();
    refreshing
        .await
        .expect("refresh task joins")
        .expect("refresh succeeds");

    let permit = rater.try_acquire_exchange().expect("ready after refresh");
    assert_eq!(permit.rates().date, day);
}

#[rstest]
#[tokio::test]
async fn held_permit_delays_refresh_until_released(day: NaiveDate) {
    let store = Arc::new(GatedStore::default());
    let rater = Arc::new(rater(
        source_returning(Ok(table(day, &[("EUR", 11_000)]))),
        store.clone(),
    ));
    let permit = rater.try_acquire_exchange().expect("ready initially");

    let refreshing = tokio::spawn({
        let rater = rater.clone();
        async move { rater.refresh().await }
    });
    tokio::task::yield_now().await;
    assert_eq!(store.adds.load(AtomicOrdering::SeqCst), 0);
    assert!(permit.rates().is_empty());

    drop(permit);
    refreshing
        .await
        .expect("refresh task joins")
        .expect("refresh succeeds");
    assert_eq!(store.adds.load(AtomicOrdering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn same_currency_exchange_ignores_refresh_gate(day: NaiveDate) {
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    let release = Arc::new(Notify::new());
    let store = Arc::new(GatedStore::gated(entered_tx, release.clone()));
    let rater = Arc::new(rater(
        source_returning(Ok(table(day, &[("EUR", 11_000)]))),
        store,
    ));
    let refreshing = tokio::spawn({
        let rater = rater.clone();
        async move { rater.refresh().await }
    });
    entered_rx.recv().await.expect("refresh reached the store");

    let converted = rater
        .exchange(Amount::from_fixed(42), &code_of("JPY"), &code_of("JPY"), day)
        .await
        .expect("fast path");

    assert_eq!(converted, Amount::from_fixed(42));
    release.notify_one();
    refreshing
        .await
        .expect("refresh task joins")
        .expect("refresh succeeds");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn run_refreshes_on_each_tick_until_shutdown(day: NaiveDate) {
    let mut source = MockRateSource::new();
    source
        .expect_fetch_rates()
        .times(3)
        .returning(move || Ok(table(day, &[("EUR", 11_000)])));
    let store = Arc::new(GatedStore::default());
    let rater = Rater::new(
        Arc::new(source),
        store.clone(),
        RaterConfig::new(code_of("USD")).with_refresh_interval(Duration::from_secs(60)),
    );

    rater
        .run(tokio::time::sleep(Duration::from_secs(150)))
        .await;

    assert_eq!(store.adds.load(AtomicOrdering::SeqCst), 3);
}
