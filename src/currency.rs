//! Currency types for home-currency price conversion

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency every derived total is expressed in
pub const HOME_CURRENCY: Currency = Currency::TRY;

/// Supported currencies (ISO 4217 codes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Turkish Lira (home)
    TRY,
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound Sterling
    GBP,
    /// Japanese Yen
    JPY,
}

impl Currency {
    /// Get ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::TRY => "TRY",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
        }
    }

    /// Get currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::TRY => "₺",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
        }
    }

    /// Parse from ISO code, ignoring case and surrounding whitespace
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "TRY" => Some(Currency::TRY),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }

    /// Get all supported currencies
    pub fn all() -> Vec<Currency> {
        vec![
            Currency::TRY,
            Currency::USD,
            Currency::EUR,
            Currency::GBP,
            Currency::JPY,
        ]
    }

    /// Supported currencies other than the home currency
    pub fn foreign() -> Vec<Currency> {
        Self::all().into_iter().filter(|c| !c.is_home()).collect()
    }

    pub fn is_home(&self) -> bool {
        *self == HOME_CURRENCY
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code() {
        assert_eq!(Currency::TRY.code(), "TRY");
        assert_eq!(Currency::EUR.code(), "EUR");
        assert_eq!(Currency::JPY.code(), "JPY");
    }

    #[test]
    fn test_currency_symbol() {
        assert_eq!(Currency::TRY.symbol(), "₺");
        assert_eq!(Currency::USD.symbol(), "$");
        assert_eq!(Currency::GBP.symbol(), "£");
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_code(" eur "), Some(Currency::EUR));
        assert_eq!(Currency::from_code("CHF"), None);
        assert_eq!(Currency::from_code(""), None);
    }

    #[test]
    fn test_foreign_excludes_home() {
        let foreign = Currency::foreign();
        assert_eq!(foreign.len(), 4);
        assert!(!foreign.contains(&HOME_CURRENCY));
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(format!("{}", Currency::USD), "USD");
        assert_eq!(Currency::TRY.to_string(), "TRY");
    }
}
