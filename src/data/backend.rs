//! Contract of the remote spreadsheet backend

use super::record::Record;
use super::wire::{DeleteRequest, DocumentStatistics, SheetInfo, SheetStatistics, UpdateRequest};
use crate::error::Result;
use std::future::Future;

/// One page of rows for a sheet (pages are 1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub file: String,
    pub sheet: String,
    pub page: u32,
    pub page_size: u32,
}

/// Operations the viewer and edit session need from the backend.
///
/// Failures are reported per call and never retried here.
pub trait Backend: Send + Sync {
    /// Connectivity probe, returns the backend's message
    fn test_connection(&self) -> impl Future<Output = Result<String>> + Send;

    fn list_files(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn list_sheets(&self, file: &str) -> impl Future<Output = Result<Vec<SheetInfo>>> + Send;

    fn sheet_statistics(
        &self,
        file: &str,
        sheet: &str,
    ) -> impl Future<Output = Result<SheetStatistics>> + Send;

    fn fetch_page(&self, query: &PageQuery) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Ask the backend to (re)read a raw file, optionally a single sheet
    fn process_file(
        &self,
        file: &str,
        sheet: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;

    fn update_record(&self, request: &UpdateRequest) -> impl Future<Output = Result<()>> + Send;

    fn delete_record(&self, request: &DeleteRequest) -> impl Future<Output = Result<()>> + Send;

    /// Document-number search restricted to the macro data file
    fn search_macro(
        &self,
        document_number: &str,
    ) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Document-number search in the account ledger file
    fn search_ledger(
        &self,
        document_number: &str,
    ) -> impl Future<Output = Result<Vec<Record>>> + Send;

    fn document_statistics(
        &self,
        document_number: &str,
    ) -> impl Future<Output = Result<DocumentStatistics>> + Send;
}
