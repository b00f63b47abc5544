//! Home-currency rate provider
//!
//! Resolves rates in priority order: manual override, cached live snapshot,
//! fresh fetch, fixed fallback. A failed fetch never reaches the caller; it
//! is logged and the fallback snapshot is served for that call only.

use super::snapshot::{ExchangeRateSnapshot, RateOrigin};
use super::source::RateSource;
use crate::currency::Currency;
use crate::error::{Result, SheetStockError};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::future::Future;

/// Default validity window of a fetched snapshot, in seconds
pub const DEFAULT_CACHE_VALIDITY_SECS: i64 = 300;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Default)]
struct RateState {
    manual: Option<ExchangeRateSnapshot>,
    cached: Option<ExchangeRateSnapshot>,
}

/// Converts amounts into the home currency
pub trait HomeConverter: Send + Sync {
    fn to_home(&self, amount: f64, currency_code: &str) -> impl Future<Output = Result<f64>> + Send;
}

/// Single owned rate view, shared by reference with every component that
/// converts prices.
///
/// State changes are synchronous and never held across a fetch, so sharing
/// through an `Arc` is safe; concurrent `get_rates` calls on an expired cache
/// may each fetch, and the last completion is what stays cached.
pub struct CurrencyRateProvider<S> {
    source: S,
    state: RwLock<RateState>,
    validity: Duration,
    clock: Clock,
}

impl<S: RateSource> CurrencyRateProvider<S> {
    /// Create a provider with the default 5 minute cache window
    pub fn new(source: S) -> Self {
        Self::with_validity(source, Duration::seconds(DEFAULT_CACHE_VALIDITY_SECS))
    }

    pub fn with_validity(source: S, validity: Duration) -> Self {
        Self {
            source,
            state: RwLock::new(RateState::default()),
            validity,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock used for snapshot timestamps and expiry
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Install (`Some`) or clear (`None`) the manual override.
    ///
    /// Only finite, strictly positive rates for supported foreign currencies
    /// are kept. If none survive, nothing changes and an input error is
    /// returned.
    pub fn set_manual_rates(&self, rates: Option<BTreeMap<Currency, f64>>) -> Result<()> {
        let Some(rates) = rates else {
            self.state.write().manual = None;
            log::info!("Manual exchange rates cleared, live rates will be used");
            return Ok(());
        };

        let valid: BTreeMap<Currency, f64> = rates
            .into_iter()
            .filter(|(currency, rate)| !currency.is_home() && rate.is_finite() && *rate > 0.0)
            .collect();

        if valid.is_empty() {
            return Err(SheetStockError::InputError(
                "enter at least one valid exchange rate".to_string(),
            ));
        }

        let snapshot = ExchangeRateSnapshot::new(valid, self.now(), RateOrigin::Manual);
        log::info!("Manual exchange rates set: {:?}", snapshot.rates());
        self.state.write().manual = Some(snapshot);
        Ok(())
    }

    pub fn has_manual_override(&self) -> bool {
        self.state.read().manual.is_some()
    }

    pub fn clear_manual_override(&self) {
        // Clearing cannot fail
        let _ = self.set_manual_rates(None);
    }

    pub fn manual_rates(&self) -> Option<ExchangeRateSnapshot> {
        self.state.read().manual.clone()
    }

    /// Last live snapshot without triggering a fetch, even if expired
    pub fn cached_rates(&self) -> Option<ExchangeRateSnapshot> {
        self.state.read().cached.clone()
    }

    /// Display symbol for a currency code; empty for unknown codes
    pub fn symbol_for(&self, currency_code: &str) -> String {
        Currency::from_code(currency_code)
            .map(|currency| currency.symbol().to_string())
            .unwrap_or_default()
    }

    /// Drop the cached snapshot so the next request fetches again
    pub fn clear_cache(&self) {
        self.state.write().cached = None;
        log::info!("Exchange-rate cache cleared");
    }

    /// Resolve the current rate view; never fails
    pub async fn get_rates(&self) -> ExchangeRateSnapshot {
        let now = self.now();
        {
            let state = self.state.read();
            if let Some(manual) = &state.manual {
                log::debug!("Using manual exchange rates");
                return manual.clone();
            }
            if let Some(cached) = &state.cached {
                if cached.is_fresh(now, self.validity) {
                    log::debug!("Using cached exchange rates from {}", cached.fetched_at());
                    return cached.clone();
                }
            }
        }

        match self.refresh().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Failed to fetch exchange rates from {}: {}", self.source.name(), e);
                let fallback = ExchangeRateSnapshot::fallback(now);
                log::warn!("Using fallback exchange rates: {:?}", fallback.rates());
                fallback
            }
        }
    }

    async fn refresh(&self) -> Result<ExchangeRateSnapshot> {
        log::debug!("Fetching fresh exchange rates from {}", self.source.name());
        let quotes = self.source.fetch_usd_quotes().await?;
        let snapshot = ExchangeRateSnapshot::from_usd_quotes(&quotes, self.now())?;
        log::info!("Exchange rates updated: {:?}", snapshot.rates());
        self.state.write().cached = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Convert `amount` of `currency_code` into the home currency.
    ///
    /// The home currency converts without a rate lookup. Unknown codes, and
    /// currencies missing from the resolved snapshot, return `amount`
    /// unchanged with a warning.
    pub async fn convert_to_home(&self, amount: f64, currency_code: &str) -> f64 {
        let Some(currency) = Currency::from_code(currency_code) else {
            log::warn!("Unsupported currency: {:?}, using original amount", currency_code);
            return amount;
        };
        if currency.is_home() {
            return amount;
        }

        let snapshot = self.get_rates().await;
        match snapshot.rate(currency) {
            Some(rate) => amount * rate,
            None => {
                log::warn!(
                    "No {:?} rate for {}, using original amount",
                    snapshot.origin(),
                    currency
                );
                amount
            }
        }
    }
}

impl<S: RateSource> HomeConverter for CurrencyRateProvider<S> {
    async fn to_home(&self, amount: f64, currency_code: &str) -> Result<f64> {
        Ok(self.convert_to_home(amount, currency_code).await)
    }
}

/// Parse manual-rate form input (`code`, typed text) into a rate map.
///
/// Accepts a comma decimal separator; blank, unparsable, non-positive and
/// unknown-currency entries are skipped.
pub fn manual_rates_from_form<'a, I>(entries: I) -> BTreeMap<Currency, f64>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    entries
        .into_iter()
        .filter_map(|(code, text)| {
            let currency = Currency::from_code(code)?;
            let rate: f64 = text.trim().replacen(',', ".", 1).parse().ok()?;
            (rate.is_finite() && rate > 0.0).then_some((currency, rate))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hashbrown::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StaticSource {
        fn ok() -> Self {
            Self { calls: AtomicUsize::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: AtomicUsize::new(0), fail: true }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RateSource for StaticSource {
        async fn fetch_usd_quotes(&self) -> Result<HashMap<String, f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SheetStockError::Network("connection refused".into()));
            }
            Ok([("TRY", 40.0), ("EUR", 0.8), ("USD", 1.0)]
                .into_iter()
                .map(|(c, q)| (c.to_string(), q))
                .collect())
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    #[tokio::test]
    async fn test_manual_override_wins() {
        let provider = CurrencyRateProvider::new(StaticSource::ok());
        provider
            .set_manual_rates(Some(BTreeMap::from([(Currency::USD, 35.0)])))
            .unwrap();

        let rates = provider.get_rates().await;
        assert_eq!(rates.origin(), RateOrigin::Manual);
        assert_eq!(rates.rate(Currency::USD), Some(35.0));
        assert_eq!(provider.source().calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_manual_rates_rejected() {
        let provider = CurrencyRateProvider::new(StaticSource::ok());
        let result = provider.set_manual_rates(Some(BTreeMap::from([
            (Currency::USD, 0.0),
            (Currency::EUR, -3.0),
            (Currency::TRY, 1.0),
        ])));

        assert!(matches!(result, Err(SheetStockError::InputError(_))));
        assert!(!provider.has_manual_override());
    }

    #[tokio::test]
    async fn test_clear_override_falls_back_to_fetch() {
        let provider = CurrencyRateProvider::new(StaticSource::ok());
        provider
            .set_manual_rates(Some(BTreeMap::from([(Currency::EUR, 50.0)])))
            .unwrap();
        provider.clear_manual_override();

        let rates = provider.get_rates().await;
        assert_eq!(rates.origin(), RateOrigin::Live);
        assert_eq!(provider.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_reused_within_window() {
        let provider = CurrencyRateProvider::new(StaticSource::ok());
        let first = provider.get_rates().await;
        let second = provider.get_rates().await;

        assert_eq!(first.fetched_at(), second.fetched_at());
        assert_eq!(provider.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let provider = CurrencyRateProvider::with_validity(StaticSource::ok(), Duration::zero());
        provider.get_rates().await;
        provider.get_rates().await;
        assert_eq!(provider.source().calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_serves_uncached_fallback() {
        let provider = CurrencyRateProvider::new(StaticSource::failing());
        let rates = provider.get_rates().await;

        assert_eq!(rates.origin(), RateOrigin::Fallback);
        assert!(provider.cached_rates().is_none());

        provider.get_rates().await;
        assert_eq!(provider.source().calls(), 2);
    }

    #[tokio::test]
    async fn test_convert_to_home() {
        let provider = CurrencyRateProvider::new(StaticSource::ok());

        assert_eq!(provider.convert_to_home(10.0, "TRY").await, 10.0);
        assert_eq!(provider.source().calls(), 0);

        assert_relative_eq!(provider.convert_to_home(10.0, "usd").await, 400.0);
        assert_relative_eq!(provider.convert_to_home(10.0, "EUR").await, 500.0);
        assert_eq!(provider.convert_to_home(10.0, "XAU").await, 10.0);
    }

    #[tokio::test]
    async fn test_currency_missing_from_override_is_unchanged() {
        let provider = CurrencyRateProvider::new(StaticSource::ok());
        provider
            .set_manual_rates(Some(BTreeMap::from([(Currency::USD, 35.0)])))
            .unwrap();

        assert_eq!(provider.convert_to_home(10.0, "GBP").await, 10.0);
        assert_eq!(provider.source().calls(), 0);
    }

    #[test]
    fn test_manual_rates_from_form() {
        let rates = manual_rates_from_form([
            ("USD", "34,5"),
            ("EUR", ""),
            ("GBP", "abc"),
            ("JPY", "-1"),
            ("XXX", "2"),
        ]);
        assert_eq!(rates, BTreeMap::from([(Currency::USD, 34.5)]));
    }
}
