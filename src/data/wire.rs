//! Backend response shapes and their normalization.
//!
//! The backend has shipped more than one shape for the same payload over
//! time. Every shape is an explicit variant here and is converted into the
//! canonical types from [`super::record`] right after decoding; nothing past
//! this module looks at raw responses.

use super::record::{CellValue, Fields, Record};
use crate::error::{Result, SheetStockError};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Keys that describe a flat record rather than belong to its columns
pub const RECORD_METADATA_KEYS: &[&str] = &[
    "id",
    "documentNumber",
    "fileName",
    "sheetName",
    "rowIndex",
    "createdDate",
    "modifiedDate",
    "version",
    "modifiedBy",
];

/// Either the `{success, data, message}` envelope or a bare payload
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped {
        success: bool,
        #[serde(default = "Option::default")]
        data: Option<T>,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning `success: false` into a backend error
    pub fn into_data(self, what: &str) -> Result<T> {
        match self {
            Envelope::Wrapped {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope::Wrapped {
                success: true,
                data: None,
                ..
            } => Err(SheetStockError::Format(format!("{} response has no data", what))),
            Envelope::Wrapped {
                success: false,
                message,
                ..
            } => Err(SheetStockError::Backend(
                message.unwrap_or_else(|| format!("{} failed", what)),
            )),
            Envelope::Bare(data) => Ok(data),
        }
    }
}

/// Acknowledgement for mutations and file processing
#[derive(Debug, Clone, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl OperationOutcome {
    /// Message on success, backend error otherwise
    pub fn into_result(self, what: &str) -> Result<String> {
        if self.success {
            Ok(self.message.unwrap_or_default())
        } else {
            Err(SheetStockError::Backend(
                self.message.unwrap_or_else(|| format!("{} failed", what)),
            ))
        }
    }
}

/// Sheet as listed for a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub name: String,
    #[serde(default)]
    pub row_count: u64,
}

/// Sheet listings arrive either as bare names or as structured entries
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SheetListWire {
    Names(Vec<String>),
    Detailed(Vec<SheetInfo>),
}

impl SheetListWire {
    pub fn normalize(self) -> Vec<SheetInfo> {
        match self {
            SheetListWire::Names(names) => names
                .into_iter()
                .map(|name| SheetInfo { name, row_count: 0 })
                .collect(),
            SheetListWire::Detailed(sheets) => sheets,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetStatistics {
    pub total_rows: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatistics {
    pub document_number: String,
    pub total_records: u64,
    pub file_count: u64,
    #[serde(default)]
    pub last_modified: String,
}

/// Keys dropped before counting column positions in a flat record
pub const POSITIONAL_SKIP_KEYS: &[&str] = &["id", "fileName", "sheetName", "rowIndex"];

/// Records arrive with their columns in a nested `data` bag or flattened
/// next to the metadata keys.
///
/// A record is nested whenever it carries an object under `data`, whatever
/// the types of its other keys.
#[derive(Debug)]
pub enum RecordWire {
    Nested { meta: Fields, data: Fields },
    Flat(Fields),
}

/// Value under a `data` key: a column bag, or an ordinary cell
#[derive(Deserialize)]
#[serde(untagged)]
enum DataSlot {
    Bag(Fields),
    Cell(CellValue),
}

impl<'de> Deserialize<'de> for RecordWire {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = RecordWire;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a record object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<RecordWire, A::Error> {
                let mut fields = Fields::new();
                let mut data = None;
                while let Some(key) = access.next_key::<String>()? {
                    if key == "data" {
                        match access.next_value::<DataSlot>()? {
                            DataSlot::Bag(bag) => data = Some(bag),
                            DataSlot::Cell(cell) => fields.set(key, cell),
                        }
                    } else {
                        let value = access.next_value::<CellValue>()?;
                        fields.set(key, value);
                    }
                }
                Ok(match data {
                    Some(data) => RecordWire::Nested { meta: fields, data },
                    None => RecordWire::Flat(fields),
                })
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

impl RecordWire {
    pub fn normalize(self) -> Result<Record> {
        match self {
            RecordWire::Nested { meta, data } => {
                let id = meta
                    .get("id")
                    .and_then(integer_of)
                    .ok_or_else(|| SheetStockError::Format("nested record without a readable id".to_string()))?;
                let mut record = Record::new(id, data);
                record.row_index = meta.get("rowIndex").and_then(integer_of);
                record.file_name = meta.get("fileName").and_then(text_of);
                record.document_number = meta.get("documentNumber").and_then(text_of);
                Ok(record)
            }
            RecordWire::Flat(mut fields) => {
                let id = fields
                    .get("id")
                    .and_then(integer_of)
                    .ok_or_else(|| SheetStockError::Format("record without an id".to_string()))?;
                let positional: Vec<String> = fields
                    .columns()
                    .filter(|column| !POSITIONAL_SKIP_KEYS.contains(column))
                    .map(str::to_string)
                    .collect();
                let row_index = fields.get("rowIndex").and_then(integer_of);
                let file_name = fields.get("fileName").and_then(text_of);
                let document_number = fields.get("documentNumber").and_then(text_of);
                let mut metadata = Fields::new();
                for key in RECORD_METADATA_KEYS {
                    if let Some(value) = fields.remove(key) {
                        if !POSITIONAL_SKIP_KEYS.contains(key) {
                            metadata.set(*key, value);
                        }
                    }
                }
                let mut record = Record::new(id, fields).with_positional_keys(positional);
                record.row_index = row_index;
                record.file_name = file_name;
                record.document_number = document_number;
                record.metadata = metadata;
                Ok(record)
            }
        }
    }
}

pub fn normalize_records(records: Vec<RecordWire>) -> Result<Vec<Record>> {
    records.into_iter().map(RecordWire::normalize).collect()
}

fn integer_of(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
        CellValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Metadata text, accepting numbers for document numbers and file names
fn text_of(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Text(s) => Some(s.clone()),
        CellValue::Number(_) => Some(value.to_text()),
        _ => None,
    }
}

/// Body of a single-row update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub id: i64,
    pub data: Fields,
    pub modified_by: String,
}

impl UpdateRequest {
    /// Build an update with every value coerced to text
    pub fn new(id: i64, fields: &Fields, modified_by: impl Into<String>) -> Self {
        Self {
            id,
            data: fields.to_text_fields(),
            modified_by: modified_by.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub id: i64,
    pub modified_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_names_normalize() {
        let wire: SheetListWire = serde_json::from_str(r#"["Stok", "Hesap"]"#).unwrap();
        let sheets = wire.normalize();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Stok");
        assert_eq!(sheets[0].row_count, 0);
    }

    #[test]
    fn test_sheet_objects_normalize() {
        let wire: SheetListWire =
            serde_json::from_str(r#"[{"name": "Stok", "rowCount": 120}]"#).unwrap();
        assert_eq!(
            wire.normalize(),
            vec![SheetInfo {
                name: "Stok".into(),
                row_count: 120
            }]
        );
    }

    #[test]
    fn test_nested_record() {
        let wire: RecordWire = serde_json::from_str(
            r#"{"id": 7, "rowIndex": 3, "data": {"Malzeme": "Vida", "Adet": 4}}"#,
        )
        .unwrap();
        let record = wire.normalize().unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.row_index, Some(3));
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields.get("Adet"), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn test_flat_record_strips_metadata() {
        let wire: RecordWire = serde_json::from_str(
            r#"{"id": "12", "documentNumber": "1010", "fileName": "a.xlsx",
                "version": 2, "Malzeme": "Somun", "Adet": "5"}"#,
        )
        .unwrap();
        let record = wire.normalize().unwrap();
        assert_eq!(record.id, 12);
        assert_eq!(record.document_number.as_deref(), Some("1010"));
        assert_eq!(record.file_name.as_deref(), Some("a.xlsx"));
        let columns: Vec<&str> = record.fields.columns().collect();
        assert_eq!(columns, vec!["Malzeme", "Adet"]);
    }

    #[test]
    fn test_nested_record_with_numeric_document_number() {
        let wire: RecordWire = serde_json::from_str(
            r#"{"id": 7, "documentNumber": 1010001613000100,
                "data": {"Toplam Stok Giriş Miktarı": "100", "Adet": 4}}"#,
        )
        .unwrap();
        let record = wire.normalize().unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.document_number.as_deref(), Some("1010001613000100"));
        let columns: Vec<&str> = record.fields.columns().collect();
        assert_eq!(columns, vec!["Toplam Stok Giriş Miktarı", "Adet"]);
    }

    #[test]
    fn test_nested_record_with_string_id() {
        let wire: RecordWire =
            serde_json::from_str(r#"{"id": "15", "fileName": "a.xlsx", "data": {"Adet": "2"}}"#).unwrap();
        let record = wire.normalize().unwrap();
        assert_eq!(record.id, 15);
        assert_eq!(record.file_name.as_deref(), Some("a.xlsx"));
        assert_eq!(record.fields.get("Adet"), Some(&CellValue::text("2")));
    }

    #[test]
    fn test_nested_record_without_readable_id_is_format_error() {
        let wire: RecordWire =
            serde_json::from_str(r#"{"id": {"oid": 1}, "data": {"Adet": "2"}}"#).unwrap();
        assert!(matches!(wire.normalize(), Err(SheetStockError::Format(_))));
    }

    #[test]
    fn test_scalar_data_key_stays_a_column() {
        let wire: RecordWire = serde_json::from_str(r#"{"id": 3, "data": "x", "Adet": 1}"#).unwrap();
        let record = wire.normalize().unwrap();
        let columns: Vec<&str> = record.fields.columns().collect();
        assert_eq!(columns, vec!["data", "Adet"]);
    }

    #[test]
    fn test_flat_record_positions_count_document_metadata() {
        let wire: RecordWire = serde_json::from_str(
            r#"{"id": 1, "documentNumber": "D-1", "fileName": "f.xlsx",
                "A": "a", "B": "b", "C": "c", "D": "d", "E": "e", "F": "Mamul", "G": "Hammadde"}"#,
        )
        .unwrap();
        let record = wire.normalize().unwrap();
        let columns: Vec<&str> = record.fields.columns().collect();
        assert_eq!(columns, vec!["A", "B", "C", "D", "E", "F", "G"]);
        assert_eq!(record.metadata.get("documentNumber"), Some(&CellValue::text("D-1")));
        assert_eq!(record.at_position(0), Some(("documentNumber", &CellValue::text("D-1"))));
        assert_eq!(record.at_position(6), Some(("F", &CellValue::text("Mamul"))));
    }

    #[test]
    fn test_flat_record_without_id_is_format_error() {
        let wire: RecordWire = serde_json::from_str(r#"{"Malzeme": "Somun"}"#).unwrap();
        assert!(matches!(wire.normalize(), Err(SheetStockError::Format(_))));
    }

    #[test]
    fn test_envelope_variants() {
        let wrapped: Envelope<Vec<String>> =
            serde_json::from_str(r#"{"success": true, "data": ["a.xlsx"]}"#).unwrap();
        assert_eq!(wrapped.into_data("files").unwrap(), vec!["a.xlsx"]);

        let bare: Envelope<Vec<String>> = serde_json::from_str(r#"["b.xlsx"]"#).unwrap();
        assert_eq!(bare.into_data("files").unwrap(), vec!["b.xlsx"]);

        let failed: Envelope<Vec<String>> =
            serde_json::from_str(r#"{"success": false, "message": "not processed"}"#).unwrap();
        match failed.into_data("files") {
            Err(SheetStockError::Backend(msg)) => assert_eq!(msg, "not processed"),
            other => panic!("unexpected: {:?}", other),
        }

        let empty: Envelope<Vec<String>> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(empty.into_data("files"), Err(SheetStockError::Format(_))));
    }

    #[test]
    fn test_update_request_serializes_text() {
        let fields: Fields = vec![
            ("Adet", CellValue::Number(60.0)),
            ("Para Birimi", CellValue::text("USD")),
        ]
        .into_iter()
        .collect();
        let request = UpdateRequest::new(5, &fields, "Frontend User");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 5,
                "data": {"Adet": "60", "Para Birimi": "USD"},
                "modifiedBy": "Frontend User"
            })
        );
    }
}
