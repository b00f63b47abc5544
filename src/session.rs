//! Single-row edit session
//!
//! At most one row is in Editing state. Changing a derivation input issues a
//! recalculation tagged with a sequence number; only the most recently issued
//! recalculation is ever applied, so a slow currency conversion cannot
//! overwrite a newer result.

use crate::data::{Backend, CellValue, Fields, Record, UpdateRequest};
use crate::error::{Result, SheetStockError};
use crate::fx::HomeConverter;
use crate::stock::{
    compute_synchronous, compute_with_conversion, CalculationResult, LogicalColumn,
    StockCalculationInput, StockCalculator,
};

/// Which computation a recalculation uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationPath {
    /// No conversion, no suspension
    Synchronous,
    /// Total converted into the home currency, may wait on the rate provider
    Conversion,
}

/// Recalculation issued for a working copy, run outside the session borrow
#[derive(Debug, Clone)]
pub struct Recalculation {
    row_id: i64,
    seq: u64,
    input: StockCalculationInput,
    path: DerivationPath,
}

impl Recalculation {
    pub fn row_id(&self) -> i64 {
        self.row_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn path(&self) -> DerivationPath {
        self.path
    }

    pub fn input(&self) -> &StockCalculationInput {
        &self.input
    }

    pub async fn run<C: HomeConverter>(self, converter: &C) -> Recalculated {
        let result = match self.path {
            DerivationPath::Synchronous => compute_synchronous(&self.input),
            DerivationPath::Conversion => compute_with_conversion(&self.input, converter).await,
        };
        Recalculated {
            row_id: self.row_id,
            seq: self.seq,
            result,
        }
    }
}

/// Completed recalculation, ready to hand back to [`EditSession::apply`]
#[derive(Debug, Clone)]
pub struct Recalculated {
    pub row_id: i64,
    pub seq: u64,
    pub result: CalculationResult,
}

/// Outcome of [`EditSession::field_changed`]
#[derive(Debug)]
pub enum FieldChange {
    /// Not a derivation input, stored as typed
    PassThrough,
    /// Derived columns recomputed synchronously
    Recomputed,
    /// Derived columns waiting on a conversion
    Pending(Recalculation),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    Viewing,
    Editing { row_id: i64, working: Fields },
}

pub struct EditSession {
    calculator: StockCalculator,
    source: Option<String>,
    state: EditState,
    issued: u64,
}

impl EditSession {
    /// Session for rows of `source` (the originating file name)
    pub fn new(calculator: StockCalculator, source: Option<String>) -> Self {
        Self {
            calculator,
            source,
            state: EditState::Viewing,
            issued: 0,
        }
    }

    pub fn calculator(&self) -> &StockCalculator {
        &self.calculator
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Switch to another file, abandoning any working copy
    pub fn set_source(&mut self, source: Option<String>) {
        self.cancel();
        self.source = source;
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    pub fn editing_row(&self) -> Option<i64> {
        match &self.state {
            EditState::Editing { row_id, .. } => Some(*row_id),
            EditState::Viewing => None,
        }
    }

    pub fn working_copy(&self) -> Option<&Fields> {
        match &self.state {
            EditState::Editing { working, .. } => Some(working),
            EditState::Viewing => None,
        }
    }

    fn is_eligible(&self) -> bool {
        self.calculator.is_eligible(self.source.as_deref())
    }

    /// Derived columns of eligible files cannot be edited by hand
    pub fn is_read_only(&self, column: &str) -> bool {
        self.calculator.is_read_only(self.source.as_deref(), column)
    }

    /// Enter Editing for `record`, dropping any previous working copy unsaved.
    ///
    /// Eligible rows get a conversion-path recalculation so derived values
    /// are correct before the first change.
    pub fn begin_edit(&mut self, record: &Record) -> Option<Recalculation> {
        if let EditState::Editing { row_id, .. } = &self.state {
            if *row_id != record.id {
                log::debug!("Abandoning unsaved edit of row {}", row_id);
            }
        }

        self.issued += 1;
        self.state = EditState::Editing {
            row_id: record.id,
            working: record.fields.clone(),
        };

        if !self.is_eligible() {
            return None;
        }
        Some(Recalculation {
            row_id: record.id,
            seq: self.issued,
            input: self.calculator.input_from(&record.fields),
            path: DerivationPath::Conversion,
        })
    }

    /// Store a typed value and recompute derived columns if it feeds them.
    ///
    /// Unit price and currency changes take the conversion path. Quantity
    /// changes are computed synchronously as long as the row is priced in the
    /// home currency; otherwise they also convert, since the total column
    /// always holds a home-currency amount.
    pub fn field_changed(&mut self, column: &str, value: impl Into<CellValue>) -> Result<FieldChange> {
        let eligible = self.is_eligible();
        if self.is_read_only(column) {
            return Err(SheetStockError::InputError(format!(
                "{} is calculated and cannot be edited",
                column
            )));
        }

        let EditState::Editing { row_id, working } = &mut self.state else {
            return Err(SheetStockError::NoActiveEdit);
        };
        working.set(column, value);

        let logical = self
            .calculator
            .resolver()
            .classify(column)
            .filter(LogicalColumn::is_derivation_input);
        let Some(logical) = logical.filter(|_| eligible) else {
            return Ok(FieldChange::PassThrough);
        };

        let input = self.calculator.input_from(working);
        self.issued += 1;
        let converts = matches!(logical, LogicalColumn::UnitPrice | LogicalColumn::Currency)
            || !input.is_home_currency();

        if converts {
            return Ok(FieldChange::Pending(Recalculation {
                row_id: *row_id,
                seq: self.issued,
                input,
                path: DerivationPath::Conversion,
            }));
        }

        let result = compute_synchronous(&input);
        self.calculator.apply(working, &result);
        Ok(FieldChange::Recomputed)
    }

    /// Apply a finished recalculation; returns false when it was discarded
    /// as stale or for a row no longer being edited
    pub fn apply(&mut self, done: Recalculated) -> bool {
        let current = done.seq == self.issued;
        match &mut self.state {
            EditState::Editing { row_id, working } if current && *row_id == done.row_id => {
                self.calculator.apply(working, &done.result);
                true
            }
            _ => {
                log::debug!(
                    "Discarding stale recalculation #{} for row {} (latest #{})",
                    done.seq,
                    done.row_id,
                    self.issued
                );
                false
            }
        }
    }

    /// [`begin_edit`](Self::begin_edit) and run its recalculation
    pub async fn start_edit<C: HomeConverter>(&mut self, record: &Record, converter: &C) {
        if let Some(recalculation) = self.begin_edit(record) {
            let done = recalculation.run(converter).await;
            self.apply(done);
        }
    }

    /// [`field_changed`](Self::field_changed) and run any pending recalculation
    pub async fn change_field<C: HomeConverter>(
        &mut self,
        column: &str,
        value: impl Into<CellValue>,
        converter: &C,
    ) -> Result<()> {
        if let FieldChange::Pending(recalculation) = self.field_changed(column, value)? {
            let done = recalculation.run(converter).await;
            self.apply(done);
        }
        Ok(())
    }

    /// Send the working copy, every value as text.
    ///
    /// Success returns to Viewing with the saved row id. Failure keeps the
    /// working copy untouched so the save can be retried.
    pub async fn save<B: Backend>(&mut self, backend: &B, modified_by: &str) -> Result<i64> {
        let (row_id, request) = match &self.state {
            EditState::Editing { row_id, working } => {
                (*row_id, UpdateRequest::new(*row_id, working, modified_by))
            }
            EditState::Viewing => return Err(SheetStockError::NoActiveEdit),
        };

        match backend.update_record(&request).await {
            Ok(()) => {
                log::info!("Row {} saved by {}", row_id, modified_by);
                self.state = EditState::Viewing;
                Ok(row_id)
            }
            Err(e) => {
                log::warn!("Saving row {} failed: {}", row_id, e);
                Err(e)
            }
        }
    }

    /// Discard the working copy
    pub fn cancel(&mut self) {
        self.issued += 1;
        self.state = EditState::Viewing;
    }
}
