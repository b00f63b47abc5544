//! Configuration loaded from TOML
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration pointed at a local backend.

use crate::error::{Result, SheetStockError};
use crate::fx::DEFAULT_CACHE_VALIDITY_SECS;
use crate::stock::{ColumnResolver, StockCalculator, DERIVATION_MARKER};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5002/api";
pub const DEFAULT_MODIFIED_BY: &str = "Frontend User";
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_timeout_secs")]
    pub backend_timeout_secs: u64,
    /// Recorded by the backend on every update and delete
    #[serde(default = "default_modified_by")]
    pub modified_by: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub eligibility: EligibilityConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatesConfig {
    /// Base URL; `/USD` is appended
    #[serde(default = "default_rates_url")]
    pub api_url: String,
    #[serde(default = "default_cache_validity_secs")]
    pub cache_validity_secs: i64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    /// Files whose name contains this get derived stock columns
    #[serde(default = "default_marker")]
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default = "default_filter_targets")]
    pub targets: Vec<FilterTarget>,
}

/// File that supports filtering by document number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTarget {
    pub file: String,
    pub scope: FilterScope,
}

/// Which backend search serves a filter target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterScope {
    /// Quick search over the macro data, product rows excluded
    Macro,
    /// Search in the ledger file
    Ledger,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_modified_by() -> String {
    DEFAULT_MODIFIED_BY.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_rates_url() -> String {
    crate::fx::EXCHANGE_RATE_API_URL.to_string()
}

fn default_cache_validity_secs() -> i64 {
    DEFAULT_CACHE_VALIDITY_SECS
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_marker() -> String {
    DERIVATION_MARKER.to_string()
}

fn default_filter_targets() -> Vec<FilterTarget> {
    vec![
        FilterTarget {
            file: "gerceklesenmakrodata_20251003204545.xlsx".to_string(),
            scope: FilterScope::Macro,
        },
        FilterTarget {
            file: "gerceklesenhesap_20251003204832.xlsx".to_string(),
            scope: FilterScope::Ledger,
        },
    ]
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            api_url: default_rates_url(),
            cache_validity_secs: default_cache_validity_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
        }
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            targets: default_filter_targets(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            backend_timeout_secs: default_timeout_secs(),
            modified_by: default_modified_by(),
            page_size: default_page_size(),
            rates: RatesConfig::default(),
            eligibility: EligibilityConfig::default(),
            filters: FiltersConfig::default(),
        }
    }
}

/// `~/.sheetstock/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sheetstock").join("config.toml"))
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// An explicit path must exist and parse. A missing default file means
    /// defaults; a default file that exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No configuration file, using defaults");
                    return Ok(Config::default());
                }
            },
        };

        let contents = fs::read_to_string(&path).map_err(|e| {
            SheetStockError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| match e {
                SheetStockError::Config(message) => {
                    SheetStockError::Config(format!("{}: {}", path.display(), message))
                }
                other => other,
            })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| SheetStockError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(SheetStockError::Config("page_size must be at least 1".into()));
        }
        if self.rates.cache_validity_secs < 0 {
            return Err(SheetStockError::Config(
                "rates.cache_validity_secs cannot be negative".into(),
            ));
        }
        if self.backend_url.trim().is_empty() {
            return Err(SheetStockError::Config("backend_url is empty".into()));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SheetStockError::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn calculator(&self) -> StockCalculator {
        StockCalculator::new(self.eligibility.marker.clone(), ColumnResolver::standard())
    }

    /// Filter scope of `file`, or `None` when the file cannot be filtered
    pub fn filter_scope(&self, file: &str) -> Option<FilterScope> {
        self.filters
            .targets
            .iter()
            .find(|target| target.file == file)
            .map(|target| target.scope)
    }

    pub fn cache_validity(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.rates.cache_validity_secs)
    }

    pub fn backend_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn rates_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rates.timeout_secs)
    }

    #[cfg(feature = "async")]
    pub fn http_backend(&self) -> Result<crate::data::HttpBackend> {
        crate::data::HttpBackend::new(&self.backend_url, self.backend_timeout())
    }

    #[cfg(feature = "async")]
    pub fn rate_provider(
        &self,
    ) -> Result<crate::fx::CurrencyRateProvider<crate::fx::ExchangeRateApiSource>> {
        let source = crate::fx::ExchangeRateApiSource::with_base_url(
            &self.rates.api_url,
            self.rates_timeout(),
        )?;
        Ok(crate::fx::CurrencyRateProvider::with_validity(
            source,
            self.cache_validity(),
        ))
    }
}
