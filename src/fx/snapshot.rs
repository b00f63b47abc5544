//! Exchange-rate snapshots expressed in the home currency

use crate::currency::{Currency, HOME_CURRENCY};
use crate::error::{Result, SheetStockError};
use chrono::{DateTime, Duration, Utc};
use hashbrown::HashMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a snapshot's rates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateOrigin {
    /// Entered by the user, overrides everything else
    Manual,
    /// Fetched from the exchange-rate API
    Live,
    /// Fixed approximate rates used when a fetch fails
    Fallback,
}

/// Rate table: units of home currency per 1 unit of each foreign currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRateSnapshot {
    rates: BTreeMap<Currency, f64>,
    fetched_at: DateTime<Utc>,
    origin: RateOrigin,
}

impl ExchangeRateSnapshot {
    pub fn new(rates: BTreeMap<Currency, f64>, fetched_at: DateTime<Utc>, origin: RateOrigin) -> Self {
        Self {
            rates,
            fetched_at,
            origin,
        }
    }

    /// Approximate rates used when the live fetch fails
    pub fn fallback(now: DateTime<Utc>) -> Self {
        let rates = BTreeMap::from([
            (Currency::USD, 41.0),
            (Currency::EUR, 48.0),
            (Currency::GBP, 55.0),
            (Currency::JPY, 0.28),
        ]);
        Self::new(rates, now, RateOrigin::Fallback)
    }

    /// Derive home-currency rates from quotes against USD.
    ///
    /// `quotes` maps currency code to units of that currency per 1 USD, the
    /// shape the exchange-rate API returns. The home-currency quote is the USD
    /// leg every other rate goes through, so it must be present.
    pub fn from_usd_quotes(quotes: &HashMap<String, f64>, now: DateTime<Utc>) -> Result<Self> {
        let home_per_usd = quotes
            .get(HOME_CURRENCY.code())
            .copied()
            .filter(|q| q.is_finite() && *q > 0.0)
            .ok_or_else(|| {
                SheetStockError::Format(format!("no usable {} quote in rate table", HOME_CURRENCY))
            })?;

        let mut rates = BTreeMap::new();
        for currency in Currency::foreign() {
            if currency == Currency::USD {
                rates.insert(currency, home_per_usd);
                continue;
            }
            match quotes.get(currency.code()).copied() {
                Some(per_usd) if per_usd.is_finite() && per_usd > 0.0 => {
                    rates.insert(currency, home_per_usd / per_usd);
                }
                _ => log::warn!("Rate table has no usable quote for {}, skipping", currency),
            }
        }

        Ok(Self::new(rates, now, RateOrigin::Live))
    }

    /// Home-currency units per 1 unit of `currency`
    pub fn rate(&self, currency: Currency) -> Option<f64> {
        if currency.is_home() {
            return Some(1.0);
        }
        self.rates.get(&currency).copied()
    }

    pub fn rates(&self) -> &BTreeMap<Currency, f64> {
        &self.rates
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn origin(&self) -> RateOrigin {
        self.origin
    }

    /// Still inside `validity` measured from the fetch timestamp
    pub fn is_fresh(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        now - self.fetched_at < validity
    }
}
