//! Shared fixtures: in-memory backend and rate source

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use hashbrown::HashMap;
use parking_lot::Mutex;
use sheetstock::data::{
    Backend, DeleteRequest, DocumentStatistics, Fields, PageQuery, Record, SheetInfo,
    SheetStatistics, UpdateRequest,
};
use sheetstock::error::{Result, SheetStockError};
use sheetstock::fx::RateSource;
use sheetstock::stock::columns::{
    CURRENCY, INCOMING_QUANTITY, NET_QUANTITY, OUTGOING_QUANTITY, TOTAL_PRICE, UNIT_PRICE,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const MACRO_FILE: &str = "gerceklesenmakrodata_20251003204545.xlsx";
pub const LEDGER_FILE: &str = "gerceklesenhesap_20251003204832.xlsx";

pub fn stock_row(id: i64, incoming: &str, outgoing: &str, price: &str, currency: &str) -> Record {
    let fields: Fields = vec![
        ("Malzeme", "Vida"),
        (INCOMING_QUANTITY, incoming),
        (OUTGOING_QUANTITY, outgoing),
        (UNIT_PRICE, price),
        (CURRENCY, currency),
        (NET_QUANTITY, ""),
        (TOTAL_PRICE, ""),
    ]
    .into_iter()
    .collect();
    Record::new(id, fields)
}

/// Row shaped like a search result, product kind in the seventh column
pub fn search_row(id: i64, kind: &str) -> Record {
    let fields: Fields = vec![
        ("Belge No", "D-100"),
        ("Tarih", "2025-10-03"),
        ("Hesap", "150"),
        ("Malzeme Kodu", "M-1"),
        ("Malzeme", "Vida"),
        ("Depo", "Ana"),
        ("Tür", kind),
    ]
    .into_iter()
    .collect();
    Record::new(id, fields)
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 3, 12, 0, 0).unwrap()
}

/// Controllable clock for cache expiry tests
#[derive(Clone)]
pub struct TestClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

/// Rate source serving a configurable USD quote table
pub struct ScriptedRates {
    quotes: Mutex<Option<HashMap<String, f64>>>,
    calls: AtomicUsize,
}

impl ScriptedRates {
    pub fn new(quotes: &[(&str, f64)]) -> Self {
        let table = quotes.iter().map(|(c, q)| (c.to_string(), *q)).collect();
        Self {
            quotes: Mutex::new(Some(table)),
            calls: AtomicUsize::new(0),
        }
    }

    /// USD at 35 TRY, EUR at 38.5 TRY
    pub fn standard() -> Self {
        Self::new(&[("USD", 1.0), ("TRY", 35.0), ("EUR", 35.0 / 38.5), ("GBP", 0.75)])
    }

    pub fn unreachable() -> Self {
        Self {
            quotes: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_quotes(&self, quotes: &[(&str, f64)]) {
        *self.quotes.lock() = Some(quotes.iter().map(|(c, q)| (c.to_string(), *q)).collect());
    }

    pub fn go_offline(&self) {
        *self.quotes.lock() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RateSource for ScriptedRates {
    async fn fetch_usd_quotes(&self) -> Result<HashMap<String, f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quotes
            .lock()
            .clone()
            .ok_or_else(|| SheetStockError::Network("connection refused".into()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// In-memory backend that records every call
#[derive(Default)]
pub struct FakeBackend {
    pub sheets: Mutex<Vec<SheetInfo>>,
    /// `None` makes sheet statistics fail
    pub total_rows: Mutex<Option<u64>>,
    pub pages: Mutex<HashMap<u32, Vec<Record>>>,
    pub macro_results: Mutex<Vec<Record>>,
    pub ledger_results: Mutex<Vec<Record>>,
    pub fail_fetch: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_search: AtomicBool,
    pub calls: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<UpdateRequest>>,
    pub deletes: Mutex<Vec<DeleteRequest>>,
}

impl FakeBackend {
    pub fn with_sheets(names: &[&str]) -> Self {
        let backend = Self::default();
        *backend.sheets.lock() = names
            .iter()
            .map(|name| SheetInfo {
                name: name.to_string(),
                row_count: 0,
            })
            .collect();
        backend
    }

    pub fn set_page(&self, page: u32, rows: Vec<Record>) {
        self.pages.lock().insert(page, rows);
    }

    pub fn set_total_rows(&self, total: Option<u64>) {
        *self.total_rows.lock() = total;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl Backend for FakeBackend {
    async fn test_connection(&self) -> Result<String> {
        self.record("test".into());
        Ok("Excel controller is working".into())
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        self.record("files".into());
        Ok(vec![MACRO_FILE.to_string(), LEDGER_FILE.to_string()])
    }

    async fn list_sheets(&self, file: &str) -> Result<Vec<SheetInfo>> {
        self.record(format!("sheets {}", file));
        Ok(self.sheets.lock().clone())
    }

    async fn sheet_statistics(&self, file: &str, sheet: &str) -> Result<SheetStatistics> {
        self.record(format!("statistics {} {}", file, sheet));
        match *self.total_rows.lock() {
            Some(total_rows) => Ok(SheetStatistics { total_rows }),
            None => Err(SheetStockError::Network("statistics unavailable".into())),
        }
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Record>> {
        self.record(format!("page {} {} {}", query.sheet, query.page, query.page_size));
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SheetStockError::Network("connection reset".into()));
        }
        Ok(self.pages.lock().get(&query.page).cloned().unwrap_or_default())
    }

    async fn process_file(&self, file: &str, _sheet: Option<&str>) -> Result<String> {
        self.record(format!("process {}", file));
        Ok("processed".into())
    }

    async fn update_record(&self, request: &UpdateRequest) -> Result<()> {
        self.record(format!("update {}", request.id));
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(SheetStockError::Backend("record is locked".into()));
        }
        self.updates.lock().push(request.clone());
        Ok(())
    }

    async fn delete_record(&self, request: &DeleteRequest) -> Result<()> {
        self.record(format!("delete {}", request.id));
        self.deletes.lock().push(request.clone());
        Ok(())
    }

    async fn search_macro(&self, document_number: &str) -> Result<Vec<Record>> {
        self.record(format!("search-macro {}", document_number));
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(SheetStockError::Network("search timed out".into()));
        }
        Ok(self.macro_results.lock().clone())
    }

    async fn search_ledger(&self, document_number: &str) -> Result<Vec<Record>> {
        self.record(format!("search-ledger {}", document_number));
        Ok(self.ledger_results.lock().clone())
    }

    async fn document_statistics(&self, document_number: &str) -> Result<DocumentStatistics> {
        self.record(format!("doc-stats {}", document_number));
        Ok(DocumentStatistics {
            document_number: document_number.to_string(),
            total_records: self.macro_results.lock().len() as u64,
            file_count: 1,
            last_modified: "2025-10-03".into(),
        })
    }
}
