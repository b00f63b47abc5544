//! Column names and alias resolution for stock sheets
//!
//! Spreadsheet headers are free text, so each logical column is looked up
//! through a prioritized list of rules. The first rule that matches a column
//! present in the row wins.

use crate::data::{CellValue, Fields, Record};

pub const NET_QUANTITY: &str = "Toplam Stok Miktarı";
pub const OUTGOING_QUANTITY: &str = "Toplam Stok Çıkış Miktarı";
pub const INCOMING_QUANTITY: &str = "Toplam Stok Giriş Miktarı";
pub const UNIT_PRICE: &str = "Satınalma Birim Fiyat";
pub const TOTAL_PRICE: &str = "Toplam Fiyat";
pub const CURRENCY: &str = "Para Birimi";

/// Zero-based position of the product-kind column in macro search results
pub const PRODUCT_KIND_POSITION: usize = 6;

/// Columns the derivation engine and filters care about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalColumn {
    IncomingQuantity,
    OutgoingQuantity,
    UnitPrice,
    Currency,
    NetQuantity,
    TotalPrice,
    ProductKind,
}

impl LogicalColumn {
    /// The four inputs that feed derivation
    pub fn is_derivation_input(&self) -> bool {
        matches!(
            self,
            LogicalColumn::IncomingQuantity
                | LogicalColumn::OutgoingQuantity
                | LogicalColumn::UnitPrice
                | LogicalColumn::Currency
        )
    }

    /// Derived columns are shown read-only while editing
    pub fn is_derived(&self) -> bool {
        matches!(self, LogicalColumn::NetQuantity | LogicalColumn::TotalPrice)
    }
}

/// How a logical column is located in a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRule {
    /// Exact header match
    Named(String),
    /// Zero-based position in backend column order.
    ///
    /// Fragile: any column added or reordered upstream shifts the match.
    /// Kept because the product-kind column has no stable header.
    Position(usize),
}

/// Prioritized alias table for logical columns
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    rules: Vec<(LogicalColumn, Vec<ColumnRule>)>,
}

fn named(aliases: &[&str]) -> Vec<ColumnRule> {
    aliases
        .iter()
        .map(|alias| ColumnRule::Named(alias.to_string()))
        .collect()
}

impl ColumnResolver {
    /// Headers used by the macro data sheets, with their known spelling variants
    pub fn standard() -> Self {
        Self {
            rules: vec![
                (
                    LogicalColumn::IncomingQuantity,
                    named(&[INCOMING_QUANTITY, "Toplam Stok Giris Miktari", "Stok Giriş Miktarı"]),
                ),
                (
                    LogicalColumn::OutgoingQuantity,
                    named(&[OUTGOING_QUANTITY, "Toplam Stok Cikis Miktari", "Stok Çıkış Miktarı"]),
                ),
                (
                    LogicalColumn::UnitPrice,
                    named(&[UNIT_PRICE, "Satinalma Birim Fiyat", "Birim Fiyat"]),
                ),
                (LogicalColumn::Currency, named(&[CURRENCY, "Para Birim", "Döviz Cinsi"])),
                (LogicalColumn::NetQuantity, named(&[NET_QUANTITY, "Toplam Stok Miktari"])),
                (LogicalColumn::TotalPrice, named(&[TOTAL_PRICE])),
                (
                    LogicalColumn::ProductKind,
                    vec![ColumnRule::Position(PRODUCT_KIND_POSITION)],
                ),
            ],
        }
    }

    /// Replace the rules for one logical column
    pub fn with_rules(mut self, column: LogicalColumn, rules: Vec<ColumnRule>) -> Self {
        match self.rules.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = rules,
            None => self.rules.push((column, rules)),
        }
        self
    }

    pub fn rules(&self, column: LogicalColumn) -> &[ColumnRule] {
        self.rules
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    /// Locate `column` in `fields`, returning the concrete header and value
    pub fn resolve<'f>(&self, fields: &'f Fields, column: LogicalColumn) -> Option<(&'f str, &'f CellValue)> {
        self.rules(column).iter().find_map(|rule| match rule {
            ColumnRule::Named(name) => fields.iter().find(|(header, _)| *header == name.as_str()),
            ColumnRule::Position(index) => fields.at(*index),
        })
    }

    pub fn value<'f>(&self, fields: &'f Fields, column: LogicalColumn) -> Option<&'f CellValue> {
        self.resolve(fields, column).map(|(_, value)| value)
    }

    /// Like [`resolve`](Self::resolve), counting positions the way the record was delivered
    pub fn resolve_in<'r>(&self, record: &'r Record, column: LogicalColumn) -> Option<(&'r str, &'r CellValue)> {
        self.rules(column).iter().find_map(|rule| match rule {
            ColumnRule::Named(name) => record.fields.iter().find(|(header, _)| *header == name.as_str()),
            ColumnRule::Position(index) => record.at_position(*index),
        })
    }

    /// Header written when a column is not yet present in the row
    pub fn canonical_name(&self, column: LogicalColumn) -> Option<&str> {
        self.rules(column).iter().find_map(|rule| match rule {
            ColumnRule::Named(name) => Some(name.as_str()),
            ColumnRule::Position(_) => None,
        })
    }

    /// Header to write `column` under: the one already in the row, or the canonical one
    pub fn target_name(&self, fields: &Fields, column: LogicalColumn) -> Option<String> {
        self.resolve(fields, column)
            .map(|(header, _)| header.to_string())
            .or_else(|| self.canonical_name(column).map(str::to_string))
    }

    /// Logical column a concrete header refers to, by name aliases only
    pub fn classify(&self, header: &str) -> Option<LogicalColumn> {
        self.rules.iter().find_map(|(column, rules)| {
            rules
                .iter()
                .any(|rule| matches!(rule, ColumnRule::Named(name) if name == header))
                .then_some(*column)
        })
    }

    /// Canonical headers of the four derivation inputs
    pub fn derivation_inputs(&self) -> Vec<&str> {
        [
            LogicalColumn::IncomingQuantity,
            LogicalColumn::OutgoingQuantity,
            LogicalColumn::UnitPrice,
            LogicalColumn::Currency,
        ]
        .into_iter()
        .filter_map(|column| self.canonical_name(column))
        .collect()
    }
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: &[(&str, &str)]) -> Fields {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_resolve_prefers_first_alias() {
        let resolver = ColumnResolver::standard();
        let fields = row(&[("Birim Fiyat", "3"), (UNIT_PRICE, "5")]);

        let (header, value) = resolver.resolve(&fields, LogicalColumn::UnitPrice).unwrap();
        assert_eq!(header, UNIT_PRICE);
        assert_eq!(value, &CellValue::text("5"));
    }

    #[test]
    fn test_resolve_spelling_variant() {
        let resolver = ColumnResolver::standard();
        let fields = row(&[("Toplam Stok Giris Miktari", "12")]);
        assert_eq!(
            resolver.value(&fields, LogicalColumn::IncomingQuantity),
            Some(&CellValue::text("12"))
        );
        assert_eq!(resolver.value(&fields, LogicalColumn::OutgoingQuantity), None);
    }

    #[test]
    fn test_product_kind_is_positional() {
        let resolver = ColumnResolver::standard();
        let fields = row(&[
            ("A", "1"),
            ("B", "2"),
            ("C", "3"),
            ("D", "4"),
            ("E", "5"),
            ("F", "6"),
            ("Tür", "Mamul"),
        ]);
        let (header, value) = resolver.resolve(&fields, LogicalColumn::ProductKind).unwrap();
        assert_eq!(header, "Tür");
        assert_eq!(value, &CellValue::text("Mamul"));

        assert!(resolver.resolve(&row(&[("A", "1")]), LogicalColumn::ProductKind).is_none());
    }

    #[test]
    fn test_resolve_in_uses_record_positions() {
        let resolver = ColumnResolver::standard();
        let fields = row(&[("A", "1"), ("B", "2"), ("C", "3"), ("D", "4"), ("E", "5"), ("F", "Mamul"), ("G", "Sarf")]);
        let mut keys = vec!["documentNumber".to_string()];
        keys.extend(fields.columns().map(str::to_string));
        let mut record = Record::new(1, fields).with_positional_keys(keys);
        record.metadata.set("documentNumber", "D-1");

        let (header, _) = resolver.resolve_in(&record, LogicalColumn::ProductKind).unwrap();
        assert_eq!(header, "F");
        assert_eq!(resolver.resolve(&record.fields, LogicalColumn::ProductKind).unwrap().0, "G");
        // Named rules still read the columns
        assert!(resolver.resolve_in(&record, LogicalColumn::UnitPrice).is_none());
    }

    #[test]
    fn test_classify_and_target_name() {
        let resolver = ColumnResolver::standard();
        assert_eq!(resolver.classify(CURRENCY), Some(LogicalColumn::Currency));
        assert_eq!(resolver.classify("Satinalma Birim Fiyat"), Some(LogicalColumn::UnitPrice));
        assert_eq!(resolver.classify("Açıklama"), None);

        let fields = row(&[("Toplam Stok Miktari", "0")]);
        assert_eq!(
            resolver.target_name(&fields, LogicalColumn::NetQuantity).as_deref(),
            Some("Toplam Stok Miktari")
        );
        assert_eq!(
            resolver.target_name(&fields, LogicalColumn::TotalPrice).as_deref(),
            Some(TOTAL_PRICE)
        );
    }

    #[test]
    fn test_with_rules_overrides() {
        let resolver = ColumnResolver::standard()
            .with_rules(LogicalColumn::ProductKind, vec![ColumnRule::Named("Malzeme Türü".into())]);
        let fields = row(&[("Malzeme Türü", "Hammadde")]);
        assert_eq!(
            resolver.value(&fields, LogicalColumn::ProductKind),
            Some(&CellValue::text("Hammadde"))
        );
        assert_eq!(resolver.derivation_inputs().len(), 4);
    }
}
