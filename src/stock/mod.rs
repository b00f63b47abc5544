//! Stock derivation for macro data sheets
//!
//! # Components
//!
//! - **columns**: Column headers and the prioritized alias table
//! - **numeric**: Lenient numeric coercion and Turkish number formatting
//! - **calculator**: Eligibility, net quantity and home-currency totals

pub mod calculator;
pub mod columns;
pub mod numeric;

pub use calculator::{
    compute_synchronous, compute_with_conversion, is_eligible, CalculationResult,
    StockCalculationInput, StockCalculator, DERIVATION_MARKER,
};
pub use columns::{ColumnResolver, ColumnRule, LogicalColumn};
pub use numeric::{format_number, parse_decimal_prefix, to_numeric_value};
