//! Derived stock fields: net quantity and total price in the home currency

use super::columns::{ColumnResolver, LogicalColumn};
use super::numeric::to_numeric_value;
use crate::currency::{Currency, HOME_CURRENCY};
use crate::data::{CellValue, Fields};
use crate::fx::HomeConverter;
use serde::Serialize;

/// File-name marker of the sheets that carry derived stock columns
pub const DERIVATION_MARKER: &str = "gerceklesenmakrodata";

/// True only when `source` (the originating file name) contains `marker`
pub fn is_eligible(source: Option<&str>, marker: &str) -> bool {
    match source {
        Some(name) if !marker.is_empty() => name.contains(marker),
        _ => false,
    }
}

/// Raw inputs for one edited record
#[derive(Debug, Clone, PartialEq)]
pub struct StockCalculationInput {
    pub incoming_quantity: f64,
    pub outgoing_quantity: f64,
    pub unit_price: f64,
    /// Code as typed; blank means the home currency
    pub currency_code: String,
}

impl StockCalculationInput {
    pub fn new(
        incoming_quantity: f64,
        outgoing_quantity: f64,
        unit_price: f64,
        currency_code: impl Into<String>,
    ) -> Self {
        Self {
            incoming_quantity,
            outgoing_quantity,
            unit_price,
            currency_code: currency_code.into(),
        }
    }

    /// Read the four input columns from a row, coercing leniently
    pub fn from_fields(fields: &Fields, resolver: &ColumnResolver) -> Self {
        let number = |column| {
            resolver
                .value(fields, column)
                .map(to_numeric_value)
                .unwrap_or(0.0)
        };
        let currency_code = resolver
            .value(fields, LogicalColumn::Currency)
            .filter(|value| !value.is_blank())
            .map(|value| value.to_text().trim().to_string())
            .unwrap_or_else(|| HOME_CURRENCY.code().to_string());

        Self {
            incoming_quantity: number(LogicalColumn::IncomingQuantity),
            outgoing_quantity: number(LogicalColumn::OutgoingQuantity),
            unit_price: number(LogicalColumn::UnitPrice),
            currency_code,
        }
    }

    /// Blank and home-currency codes need no conversion
    pub fn is_home_currency(&self) -> bool {
        let code = self.currency_code.trim();
        code.is_empty() || Currency::from_code(code).is_some_and(|c| c.is_home())
    }

    fn original_currency(&self) -> String {
        if self.currency_code.trim().is_empty() {
            HOME_CURRENCY.code().to_string()
        } else {
            self.currency_code.trim().to_string()
        }
    }
}

/// Derived values, merged back into the record before it is saved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    /// Incoming minus outgoing; negative means net depletion
    pub net_quantity: f64,
    /// Net quantity times unit price, in the original currency
    pub total_price_original: f64,
    /// Total price in the home currency; the only total ever displayed or saved
    pub total_price_home: f64,
    pub original_currency: String,
}

/// Net quantity and totals without any conversion; the home total equals
/// the original total
pub fn compute_synchronous(input: &StockCalculationInput) -> CalculationResult {
    let net_quantity = input.incoming_quantity - input.outgoing_quantity;
    let total_price_original = net_quantity * input.unit_price;

    CalculationResult {
        net_quantity,
        total_price_original,
        total_price_home: total_price_original,
        original_currency: input.original_currency(),
    }
}

/// Like [`compute_synchronous`], converting the total for foreign currencies.
///
/// A failed conversion is logged and the unconverted total is used.
pub async fn compute_with_conversion<C: HomeConverter>(
    input: &StockCalculationInput,
    converter: &C,
) -> CalculationResult {
    let mut result = compute_synchronous(input);
    if input.is_home_currency() {
        return result;
    }

    let converted = converter
        .to_home(result.total_price_original, &result.original_currency)
        .await;
    match converted {
        Ok(converted) if converted.is_finite() => {
            log::debug!(
                "Currency conversion: {} {} = {:.2} {}",
                result.total_price_original,
                result.original_currency,
                converted,
                HOME_CURRENCY
            );
            result.total_price_home = converted;
        }
        Ok(converted) => {
            log::error!("Currency conversion produced {}, using original price", converted);
        }
        Err(e) => {
            log::error!("Currency conversion failed, using original price: {}", e);
        }
    }
    result
}

/// Derivation bound to an eligibility marker and a column alias table
#[derive(Debug, Clone)]
pub struct StockCalculator {
    marker: String,
    resolver: ColumnResolver,
}

impl StockCalculator {
    pub fn new(marker: impl Into<String>, resolver: ColumnResolver) -> Self {
        Self {
            marker: marker.into(),
            resolver,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn resolver(&self) -> &ColumnResolver {
        &self.resolver
    }

    pub fn is_eligible(&self, source: Option<&str>) -> bool {
        is_eligible(source, &self.marker)
    }

    pub fn input_from(&self, fields: &Fields) -> StockCalculationInput {
        StockCalculationInput::from_fields(fields, &self.resolver)
    }

    /// Write net quantity and home-currency total into `fields`
    pub fn apply(&self, fields: &mut Fields, result: &CalculationResult) {
        if let Some(name) = self.resolver.target_name(fields, LogicalColumn::NetQuantity) {
            fields.set(name, CellValue::Number(result.net_quantity));
        }
        if let Some(name) = self.resolver.target_name(fields, LogicalColumn::TotalPrice) {
            fields.set(name, CellValue::Number(result.total_price_home));
        }
    }

    /// Fields with derived columns recomputed, unconverted; unchanged for
    /// non-eligible sources
    pub fn derive_sync(&self, source: Option<&str>, fields: &Fields) -> Fields {
        let mut derived = fields.clone();
        if self.is_eligible(source) {
            let result = compute_synchronous(&self.input_from(fields));
            self.apply(&mut derived, &result);
        }
        derived
    }

    /// Fields with derived columns recomputed and the total converted into
    /// the home currency; unchanged for non-eligible sources
    pub async fn derive_with_conversion<C: HomeConverter>(
        &self,
        source: Option<&str>,
        fields: &Fields,
        converter: &C,
    ) -> Fields {
        let mut derived = fields.clone();
        if self.is_eligible(source) {
            let result = compute_with_conversion(&self.input_from(fields), converter).await;
            self.apply(&mut derived, &result);
        }
        derived
    }

    /// Derived columns are read-only in the edit form of eligible files
    pub fn is_read_only(&self, source: Option<&str>, column: &str) -> bool {
        self.is_eligible(source)
            && self
                .resolver
                .classify(column)
                .is_some_and(|logical| logical.is_derived())
    }
}

impl Default for StockCalculator {
    fn default() -> Self {
        Self::new(DERIVATION_MARKER, ColumnResolver::standard())
    }
}
