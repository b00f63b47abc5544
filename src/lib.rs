//! # sheetstock
//!
//! Stock record editing on top of a spreadsheet backend.
//!
//! Rows of macro data sheets carry two derived columns, net stock quantity
//! and total price in Turkish lira. They are recomputed whenever an input
//! column changes, using live exchange rates, a short-lived rate cache,
//! manual overrides and fixed fallback rates in that order of preference.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sheetstock::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let config = Config::load(None)?;
//! let backend = config.http_backend()?;
//! let rates = config.rate_provider()?;
//!
//! let mut view = DataView::from_config(&backend, "gerceklesenmakrodata_20251003204545.xlsx", &config);
//! view.load_sheets().await?;
//! view.load_page().await?;
//!
//! let mut session = view.edit_session(&config);
//! if let Some(record) = view.visible_rows().first().cloned() {
//!     session.start_edit(&record, &rates).await;
//!     session.change_field("Toplam Stok Çıkış Miktarı", "12", &rates).await?;
//!     view.save_edit(&mut session, &config.modified_by).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod currency;
pub mod data;
pub mod error;
pub mod fx;
pub mod session;
pub mod stock;
pub mod viewer;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::{Config, FilterScope, FilterTarget};
    pub use crate::currency::{Currency, HOME_CURRENCY};
    pub use crate::data::{Backend, CellValue, Fields, PageQuery, Record};
    pub use crate::error::{Result, SheetStockError};
    pub use crate::fx::{CurrencyRateProvider, ExchangeRateSnapshot, HomeConverter, RateSource};
    pub use crate::session::{EditSession, EditState, FieldChange};
    pub use crate::stock::{
        compute_synchronous, compute_with_conversion, to_numeric_value, CalculationResult,
        StockCalculationInput, StockCalculator,
    };
    pub use crate::viewer::DataView;
}
