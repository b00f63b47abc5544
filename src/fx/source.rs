//! External exchange-rate sources

use crate::error::Result;
use hashbrown::HashMap;
use std::future::Future;

/// Endpoint serving current rates, requested as `{base}/USD`
pub const EXCHANGE_RATE_API_URL: &str = "https://api.exchangerate-api.com/v4/latest";

/// Source of current quotes against USD
pub trait RateSource: Send + Sync {
    /// Fetch a table of currency code -> units of that currency per 1 USD
    fn fetch_usd_quotes(&self) -> impl Future<Output = Result<HashMap<String, f64>>> + Send;

    /// Get the source name
    fn name(&self) -> &str;
}

#[cfg(feature = "async")]
pub use http::ExchangeRateApiSource;

#[cfg(feature = "async")]
mod http {
    use super::{RateSource, EXCHANGE_RATE_API_URL};
    use crate::error::{Result, SheetStockError};
    use hashbrown::HashMap;
    use reqwest::Client;
    use serde::Deserialize;
    use std::time::Duration;

    /// Public exchange-rate API (no API key required)
    pub struct ExchangeRateApiSource {
        client: Client,
        base_url: String,
    }

    #[derive(Debug, Deserialize)]
    struct LatestRatesResponse {
        #[serde(default)]
        base: Option<String>,
        rates: Option<HashMap<String, f64>>,
    }

    impl ExchangeRateApiSource {
        /// Create a source against the default public endpoint
        pub fn new() -> Result<Self> {
            Self::with_base_url(EXCHANGE_RATE_API_URL, Duration::from_secs(30))
        }

        pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SheetStockError::Network(format!("Failed to create HTTP client: {}", e)))?;

            Ok(Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            })
        }

        fn parse_body(text: &str) -> Result<HashMap<String, f64>> {
            let body: LatestRatesResponse = serde_json::from_str(text)
                .map_err(|e| SheetStockError::Format(format!("rate response: {}", e)))?;

            if let Some(base) = body.base.as_deref() {
                if !base.eq_ignore_ascii_case("USD") {
                    return Err(SheetStockError::Format(format!(
                        "rate table quoted against {} instead of USD",
                        base
                    )));
                }
            }

            body.rates
                .ok_or_else(|| SheetStockError::Format("no rates found in response".to_string()))
        }
    }

    impl RateSource for ExchangeRateApiSource {
        async fn fetch_usd_quotes(&self) -> Result<HashMap<String, f64>> {
            let url = format!("{}/USD", self.base_url);
            log::debug!("Fetching exchange rates from {}", url);

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| SheetStockError::Network(format!("HTTP request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(SheetStockError::Network(format!(
                    "Exchange-rate API returned error: {}",
                    response.status()
                )));
            }

            let text = response
                .text()
                .await
                .map_err(|e| SheetStockError::Network(format!("Failed to read response: {}", e)))?;

            Self::parse_body(&text)
        }

        fn name(&self) -> &str {
            "exchangerate-api"
        }
    }

}
