//! Foreign Exchange (FX) rates for home-currency price conversion
//!
//! # Components
//!
//! - **snapshot**: Rate tables in home-currency units and their origin
//! - **source**: `RateSource` trait and the public exchange-rate API client
//! - **provider**: `CurrencyRateProvider`, the manual/cache/fetch/fallback chain
//!
//! # Example
//!
//! ```rust
//! use sheetstock::currency::Currency;
//! use sheetstock::fx::{CurrencyRateProvider, RateSource};
//! use sheetstock::error::Result;
//! use hashbrown::HashMap;
//! use std::collections::BTreeMap;
//!
//! struct Offline;
//!
//! impl RateSource for Offline {
//!     async fn fetch_usd_quotes(&self) -> Result<HashMap<String, f64>> {
//!         Ok(HashMap::new())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "offline"
//!     }
//! }
//!
//! let provider = CurrencyRateProvider::new(Offline);
//! provider
//!     .set_manual_rates(Some(BTreeMap::from([(Currency::USD, 35.0)])))
//!     .unwrap();
//! assert!(provider.has_manual_override());
//! ```

pub mod provider;
pub mod snapshot;
pub mod source;

pub use provider::{
    manual_rates_from_form, CurrencyRateProvider, HomeConverter, DEFAULT_CACHE_VALIDITY_SECS,
};
pub use snapshot::{ExchangeRateSnapshot, RateOrigin};
#[cfg(feature = "async")]
pub use source::ExchangeRateApiSource;
pub use source::{RateSource, EXCHANGE_RATE_API_URL};
