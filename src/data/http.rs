//! reqwest implementation of [`Backend`]

use super::backend::{Backend, PageQuery};
use super::record::Record;
use super::wire::{
    normalize_records, DeleteRequest, DocumentStatistics, Envelope, OperationOutcome, RecordWire,
    SheetInfo, SheetListWire, SheetStatistics, UpdateRequest,
};
use crate::error::{Result, SheetStockError};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the spreadsheet backend
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:5002/api`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SheetStockError::Config(format!("Invalid backend URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SheetStockError::Config(format!(
                "Backend URL cannot have paths: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SheetStockError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with each segment appended and percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SheetStockError::Network(format!("{} request failed: {}", what, e)))?;
        read_json(response, what).await
    }

    async fn fetch_records(&self, url: Url, what: &str) -> Result<Vec<Record>> {
        let envelope: Envelope<Vec<RecordWire>> = self.get_json(url, what).await?;
        normalize_records(envelope.into_data(what)?)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SheetStockError::Network(format!(
            "{} returned {}: {}",
            what,
            status,
            body.trim()
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| SheetStockError::Network(format!("Failed to read {} response: {}", what, e)))?;

    serde_json::from_str(&text).map_err(|e| SheetStockError::Format(format!("{}: {}", what, e)))
}

impl Backend for HttpBackend {
    async fn test_connection(&self) -> Result<String> {
        let url = self.endpoint(&["excel", "test"]);
        let outcome: OperationOutcome = self.get_json(url, "connection test").await?;
        outcome.into_result("connection test")
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["excel", "files"]);
        let envelope: Envelope<Vec<String>> = self.get_json(url, "file list").await?;
        envelope.into_data("file list")
    }

    async fn list_sheets(&self, file: &str) -> Result<Vec<SheetInfo>> {
        let url = self.endpoint(&["excel", "sheets", file]);
        let envelope: Envelope<SheetListWire> = self.get_json(url, "sheet list").await?;
        Ok(envelope.into_data("sheet list")?.normalize())
    }

    async fn sheet_statistics(&self, file: &str, sheet: &str) -> Result<SheetStatistics> {
        let mut url = self.endpoint(&["excel", "statistics", file]);
        url.query_pairs_mut().append_pair("sheetName", sheet);
        let envelope: Envelope<SheetStatistics> = self.get_json(url, "sheet statistics").await?;
        envelope.into_data("sheet statistics")
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Record>> {
        let mut url = self.endpoint(&["excel", "data", query.file.as_str()]);
        url.query_pairs_mut()
            .append_pair("sheetName", &query.sheet)
            .append_pair("page", &query.page.to_string())
            .append_pair("pageSize", &query.page_size.to_string());
        self.fetch_records(url, "row page").await
    }

    async fn process_file(&self, file: &str, sheet: Option<&str>) -> Result<String> {
        let mut url = self.endpoint(&["excel", "read", file]);
        if let Some(sheet) = sheet {
            url.query_pairs_mut().append_pair("sheetName", sheet);
        }
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| SheetStockError::Network(format!("file processing request failed: {}", e)))?;
        let outcome: OperationOutcome = read_json(response, "file processing").await?;
        outcome.into_result("file processing")
    }

    async fn update_record(&self, request: &UpdateRequest) -> Result<()> {
        let url = self.endpoint(&["excel", "update"]);
        log::debug!("PUT {} (row {})", url, request.id);
        let response = self
            .client
            .put(url)
            .json(request)
            .send()
            .await
            .map_err(|e| SheetStockError::Network(format!("update request failed: {}", e)))?;
        let outcome: OperationOutcome = read_json(response, "update").await?;
        outcome.into_result("update").map(|_| ())
    }

    async fn delete_record(&self, request: &DeleteRequest) -> Result<()> {
        let url = self.endpoint(&["excel", "delete"]);
        log::debug!("DELETE {} (row {})", url, request.id);
        let response = self
            .client
            .delete(url)
            .json(request)
            .send()
            .await
            .map_err(|e| SheetStockError::Network(format!("delete request failed: {}", e)))?;
        let outcome: OperationOutcome = read_json(response, "delete").await?;
        outcome.into_result("delete").map(|_| ())
    }

    async fn search_macro(&self, document_number: &str) -> Result<Vec<Record>> {
        let url = self.endpoint(&["macro", "quick-search-makro-only", document_number]);
        self.fetch_records(url, "macro search").await
    }

    async fn search_ledger(&self, document_number: &str) -> Result<Vec<Record>> {
        let url = self.endpoint(&["macro", "search-in-hesap", document_number]);
        self.fetch_records(url, "ledger search").await
    }

    async fn document_statistics(&self, document_number: &str) -> Result<DocumentStatistics> {
        let url = self.endpoint(&["macro", "document-statistics", document_number]);
        let envelope: Envelope<DocumentStatistics> =
            self.get_json(url, "document statistics").await?;
        envelope.into_data("document statistics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encoding() {
        let backend = HttpBackend::new("http://localhost:5002/api/", Duration::from_secs(5)).unwrap();
        let url = backend.endpoint(&["excel", "sheets", "stok listesi.xlsx"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:5002/api/excel/sheets/stok%20listesi.xlsx"
        );
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:5002/api", Duration::from_secs(5)).unwrap();
        let url = backend.endpoint(&["macro", "document-statistics", "1010001613000100"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:5002/api/macro/document-statistics/1010001613000100"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpBackend::new("not a url", Duration::from_secs(5)),
            Err(SheetStockError::Config(_))
        ));
        assert!(HttpBackend::new("mailto:ops@example.com", Duration::from_secs(5)).is_err());
    }
}
