//! Spreadsheet row data and the backend that owns it
//!
//! # Components
//!
//! - **record**: Canonical row types (`Record`, ordered `Fields`, `CellValue`)
//! - **wire**: Response shapes and their normalization
//! - **backend**: The `Backend` trait consumed by the viewer and edit session
//! - **http**: reqwest implementation of `Backend` (feature `async`)

pub mod backend;
#[cfg(feature = "async")]
pub mod http;
pub mod record;
pub mod wire;

pub use backend::{Backend, PageQuery};
#[cfg(feature = "async")]
pub use http::HttpBackend;
pub use record::{CellValue, Fields, Record};
pub use wire::{DeleteRequest, DocumentStatistics, SheetInfo, SheetStatistics, UpdateRequest};
