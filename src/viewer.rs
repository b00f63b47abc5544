//! Paged view over one file, with document-number filtering

use crate::config::{Config, FilterScope, FilterTarget};
use crate::data::{Backend, DeleteRequest, PageQuery, Record, SheetInfo};
use crate::error::{Result, SheetStockError};
use crate::session::EditSession;
use crate::stock::{ColumnResolver, LogicalColumn};
use hashbrown::HashSet;

/// Product-kind value whose rows never appear in filter results
pub const EXCLUDED_PRODUCT_KIND: &str = "mamul";

/// Sheet that always pages at [`STOCK_SHEET_PAGE_SIZE`] rows
pub const STOCK_SHEET: &str = "stok";
pub const STOCK_SHEET_PAGE_SIZE: u32 = 50;

/// Rows returned for the active document-number filter
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveFilter {
    pub document_number: String,
    pub scope: FilterScope,
    pub rows: Vec<Record>,
}

/// True when the row's product-kind column mentions [`EXCLUDED_PRODUCT_KIND`]
pub fn is_excluded_product(record: &Record, resolver: &ColumnResolver) -> bool {
    resolver
        .resolve_in(record, LogicalColumn::ProductKind)
        .map(|(_, value)| value.to_text().trim().to_lowercase().contains(EXCLUDED_PRODUCT_KIND))
        .unwrap_or(false)
}

/// Drop excluded product rows and repeated ids, keeping first occurrences
pub fn refine_search_results(records: Vec<Record>, resolver: &ColumnResolver) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| !is_excluded_product(record, resolver))
        .filter(|record| seen.insert(record.id))
        .collect()
}

pub struct DataView<'a, B> {
    backend: &'a B,
    file: String,
    page_size: u32,
    targets: Vec<FilterTarget>,
    resolver: ColumnResolver,
    sheets: Vec<SheetInfo>,
    sheet: Option<String>,
    page: u32,
    total_rows: Option<u64>,
    /// `total_rows` was counted from loaded pages, not from statistics
    total_inferred: bool,
    /// The last inferred page came back full
    more_rows: bool,
    rows: Vec<Record>,
    filter: Option<ActiveFilter>,
}

impl<'a, B: Backend> DataView<'a, B> {
    pub fn new(backend: &'a B, file: impl Into<String>, page_size: u32, targets: Vec<FilterTarget>) -> Self {
        Self {
            backend,
            file: file.into(),
            page_size: page_size.max(1),
            targets,
            resolver: ColumnResolver::standard(),
            sheets: Vec::new(),
            sheet: None,
            page: 1,
            total_rows: None,
            total_inferred: false,
            more_rows: false,
            rows: Vec::new(),
            filter: None,
        }
    }

    pub fn from_config(backend: &'a B, file: impl Into<String>, config: &Config) -> Self {
        Self::new(backend, file, config.page_size, config.filters.targets.clone())
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn sheets(&self) -> &[SheetInfo] {
        &self.sheets
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    /// One-based
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Configured page size; the stock sheet overrides it
    pub fn page_size(&self) -> u32 {
        match &self.sheet {
            Some(sheet) if sheet.trim().eq_ignore_ascii_case(STOCK_SHEET) => STOCK_SHEET_PAGE_SIZE,
            _ => self.page_size,
        }
    }

    pub fn total_rows(&self) -> Option<u64> {
        self.total_rows
    }

    /// Rows of the current page, ignoring any filter
    pub fn page_rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn filter(&self) -> Option<&ActiveFilter> {
        self.filter.as_ref()
    }

    /// Filter results when a filter is active, the current page otherwise
    pub fn visible_rows(&self) -> &[Record] {
        match &self.filter {
            Some(filter) => &filter.rows,
            None => &self.rows,
        }
    }

    pub fn find_row(&self, id: i64) -> Option<&Record> {
        self.visible_rows().iter().find(|record| record.id == id)
    }

    pub fn filter_scope(&self) -> Option<FilterScope> {
        self.targets
            .iter()
            .find(|target| target.file == self.file)
            .map(|target| target.scope)
    }

    /// Edit session bound to this file
    pub fn edit_session(&self, config: &Config) -> EditSession {
        EditSession::new(config.calculator(), Some(self.file.clone()))
    }

    /// Fetch the sheet list and select the first sheet
    pub async fn load_sheets(&mut self) -> Result<&[SheetInfo]> {
        let sheets = self.backend.list_sheets(&self.file).await?;
        log::debug!("{}: {} sheets", self.file, sheets.len());
        self.sheets = sheets;

        if let Some(first) = self.sheets.first().map(|sheet| sheet.name.clone()) {
            self.select_sheet(&first).await;
        } else {
            self.sheet = None;
            self.total_rows = None;
            self.total_inferred = false;
            self.more_rows = false;
        }
        Ok(&self.sheets)
    }

    /// Switch sheets, back to page 1; the row total is refreshed from
    /// sheet statistics, or inferred later when they are unavailable
    pub async fn select_sheet(&mut self, sheet: &str) {
        self.sheet = Some(sheet.to_string());
        self.page = 1;
        self.rows.clear();
        self.filter = None;

        self.more_rows = false;
        self.total_rows = match self.backend.sheet_statistics(&self.file, sheet).await {
            Ok(stats) => {
                self.total_inferred = false;
                Some(stats.total_rows)
            }
            Err(e) => {
                log::warn!("Statistics for {} / {} unavailable: {}", self.file, sheet, e);
                self.total_inferred = true;
                None
            }
        };
    }

    /// Process the file and fetch the current page.
    ///
    /// On failure the previously loaded rows stay in place.
    pub async fn load_page(&mut self) -> Result<&[Record]> {
        let sheet = self
            .sheet
            .clone()
            .ok_or_else(|| SheetStockError::InputError("no sheet selected".into()))?;

        let message = self.backend.process_file(&self.file, Some(&sheet)).await?;
        log::debug!("Processed {}: {}", self.file, message);

        let query = PageQuery {
            file: self.file.clone(),
            sheet,
            page: self.page,
            page_size: self.page_size(),
        };
        let rows = self.backend.fetch_page(&query).await?;
        log::info!(
            "Loaded {} rows from {} / {} (page {})",
            rows.len(),
            query.file,
            query.sheet,
            query.page
        );

        if self.total_rows.is_none() || self.total_inferred {
            // Lower bound: a full page means another one may follow
            let size = u64::from(query.page_size);
            let seen = u64::from(self.page - 1) * size + rows.len() as u64;
            if seen >= self.total_rows.unwrap_or(0) {
                self.total_rows = Some(seen);
                self.more_rows = rows.len() as u64 == size;
            }
            self.total_inferred = true;
        }
        self.rows = rows;
        Ok(&self.rows)
    }

    /// Known page count, plus one while an inferred total ends on a full page
    pub fn total_pages(&self) -> u32 {
        let total = self.total_rows.unwrap_or(0);
        let pages = total.div_ceil(u64::from(self.page_size())) + u64::from(self.more_rows);
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    /// True when the row total came from loaded pages rather than statistics
    pub fn total_is_inferred(&self) -> bool {
        self.total_inferred
    }

    /// Advance and load; false when already on the last page
    pub async fn next_page(&mut self) -> Result<bool> {
        if self.page >= self.total_pages() {
            return Ok(false);
        }
        self.go_to_page(self.page + 1).await?;
        Ok(true)
    }

    /// Go back and load; false when already on the first page
    pub async fn prev_page(&mut self) -> Result<bool> {
        if self.page <= 1 {
            return Ok(false);
        }
        self.go_to_page(self.page - 1).await?;
        Ok(true)
    }

    /// Load `page`, clamped to the known page range; the page number is
    /// restored if loading fails
    pub async fn go_to_page(&mut self, page: u32) -> Result<()> {
        let previous = self.page;
        let last = match self.total_rows {
            Some(_) => self.total_pages(),
            None => u32::MAX,
        };
        self.page = page.clamp(1, last);
        if let Err(e) = self.load_page().await {
            self.page = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Filter by document number; a blank number clears the filter.
    ///
    /// Only configured target files can be filtered. On failure the
    /// previous filter stays active.
    pub async fn apply_filter(&mut self, document_number: &str) -> Result<&[Record]> {
        let document_number = document_number.trim();
        if document_number.is_empty() {
            self.clear_filter();
            return Ok(&self.rows);
        }

        let scope = self.filter_scope().ok_or_else(|| {
            SheetStockError::NotEligible(format!(
                "document number filter is not available for {}",
                self.file
            ))
        })?;

        let results = match scope {
            FilterScope::Macro => self.backend.search_macro(document_number).await?,
            FilterScope::Ledger => self.backend.search_ledger(document_number).await?,
        };
        let found = results.len();
        let rows = refine_search_results(results, &self.resolver);
        log::info!(
            "Document {}: {} records found, {} shown",
            document_number,
            found,
            rows.len()
        );

        let filter = self.filter.insert(ActiveFilter {
            document_number: document_number.to_string(),
            scope,
            rows,
        });
        Ok(&filter.rows)
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Save the session's working copy and refresh what is shown
    pub async fn save_edit(&mut self, session: &mut EditSession, modified_by: &str) -> Result<i64> {
        let id = session.save(self.backend, modified_by).await?;
        self.refresh().await;
        Ok(id)
    }

    pub async fn delete_row(&mut self, id: i64, modified_by: &str) -> Result<()> {
        let request = DeleteRequest {
            id,
            modified_by: modified_by.to_string(),
        };
        self.backend.delete_record(&request).await?;
        log::info!("Row {} deleted by {}", id, modified_by);
        self.refresh().await;
        Ok(())
    }

    /// Re-run the active filter and reload the page; failures are logged only
    async fn refresh(&mut self) {
        if let Some(document_number) = self.filter.as_ref().map(|f| f.document_number.clone()) {
            if let Err(e) = self.apply_filter(&document_number).await {
                log::warn!("Refreshing filter {} failed: {}", document_number, e);
            }
        }
        if self.sheet.is_some() {
            if let Err(e) = self.load_page().await {
                log::warn!("Reloading page {} failed: {}", self.page, e);
            }
        }
    }
}
