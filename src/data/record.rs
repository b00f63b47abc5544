//! Canonical row types shared by the backend client, the derivation engine
//! and the edit session.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single spreadsheet cell as delivered by the backend or typed by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
    /// Booleans, arrays and objects; carried through but never numeric
    Other(serde_json::Value),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// String form sent back to the backend on save
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
            CellValue::Other(v) => v.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::String(s) => CellValue::Text(s),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => CellValue::Number(f),
                None => CellValue::Other(serde_json::Value::Number(n)),
            },
            other => CellValue::Other(other),
        }
    }
}

impl From<CellValue> for serde_json::Value {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Text(s) => serde_json::Value::String(s),
            CellValue::Empty => serde_json::Value::Null,
            CellValue::Other(v) => v,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Column/value pairs in the order the backend delivered them.
///
/// Order matters: some column lookups are positional, so this is a sequence
/// rather than a hash map. Setting an existing column replaces it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, CellValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Insert or replace a column, keeping its original position
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<CellValue> {
        let index = self.entries.iter().position(|(name, _)| name == column)?;
        Some(self.entries.remove(index).1)
    }

    /// Entry at a zero-based position in backend order
    pub fn at(&self, index: usize) -> Option<(&str, &CellValue)> {
        self.entries
            .get(index)
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy with every value coerced to its text form
    pub fn to_text_fields(&self) -> Fields {
        Fields {
            entries: self
                .entries
                .iter()
                .map(|(name, value)| (name.clone(), CellValue::Text(value.to_text())))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (column, value) in iter {
            fields.set(column, value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = Fields;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column names to cell values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Fields, A::Error> {
                let mut fields = Fields::new();
                while let Some((column, value)) = access.next_entry::<String, CellValue>()? {
                    fields.set(column, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// One backend row after normalization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub row_index: Option<i64>,
    pub file_name: Option<String>,
    pub document_number: Option<String>,
    pub fields: Fields,
    /// Descriptive keys lifted out of a flat record (dates, version, editor)
    #[serde(skip_serializing_if = "Fields::is_empty")]
    pub metadata: Fields,
    /// Key order for positional lookups when it differs from `fields`
    #[serde(skip)]
    positional_keys: Option<Vec<String>>,
}

impl Record {
    pub fn new(id: i64, fields: Fields) -> Self {
        Self {
            id,
            row_index: None,
            file_name: None,
            document_number: None,
            fields,
            metadata: Fields::new(),
            positional_keys: None,
        }
    }

    /// Count positions over `keys` instead of the column order.
    ///
    /// Flat records interleave document metadata with their columns, and
    /// positional lookups count those keys too.
    pub fn with_positional_keys(mut self, keys: Vec<String>) -> Self {
        self.positional_keys = Some(keys);
        self
    }

    /// Entry at a zero-based position, looked up in columns then metadata
    pub fn at_position(&self, index: usize) -> Option<(&str, &CellValue)> {
        match &self.positional_keys {
            Some(keys) => {
                let key = keys.get(index)?;
                self.fields
                    .iter()
                    .chain(self.metadata.iter())
                    .find(|(name, _)| *name == key.as_str())
            }
            None => self.fields.at(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_preserve_backend_order() {
        let json = r#"{"Zeta": 1, "Alpha": "a", "Mid": null}"#;
        let fields: Fields = serde_json::from_str(json).unwrap();

        let columns: Vec<&str> = fields.columns().collect();
        assert_eq!(columns, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(fields.at(1), Some(("Alpha", &CellValue::text("a"))));
        assert_eq!(fields.get("Mid"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut fields: Fields = vec![("A", "1"), ("B", "2")].into_iter().collect();
        fields.set("A", 5.0);
        fields.set("C", "3");

        let columns: Vec<&str> = fields.columns().collect();
        assert_eq!(columns, vec!["A", "B", "C"]);
        assert_eq!(fields.get("A"), Some(&CellValue::Number(5.0)));
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(CellValue::Number(60.0).to_text(), "60");
        assert_eq!(CellValue::Number(-2.5).to_text(), "-2.5");
        assert_eq!(CellValue::Empty.to_text(), "");
        assert_eq!(CellValue::Other(serde_json::json!(true)).to_text(), "true");

        let fields: Fields = vec![("Qty", CellValue::Number(3.0))].into_iter().collect();
        assert_eq!(fields.to_text_fields().get("Qty"), Some(&CellValue::text("3")));
    }

    #[test]
    fn test_fields_serialize_in_order() {
        let fields: Fields = vec![("b", "x"), ("a", "y")].into_iter().collect();
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"b":"x","a":"y"}"#);
    }

    #[test]
    fn test_positional_keys_reach_metadata() {
        let fields: Fields = vec![("A", "1"), ("B", "2")].into_iter().collect();
        let mut record = Record::new(1, fields.clone());
        record.metadata.set("documentNumber", "D-1");
        let record = record.with_positional_keys(vec![
            "documentNumber".to_string(),
            "A".to_string(),
            "B".to_string(),
        ]);

        assert_eq!(record.at_position(0), Some(("documentNumber", &CellValue::text("D-1"))));
        assert_eq!(record.at_position(2), Some(("B", &CellValue::text("2"))));
        assert_eq!(record.at_position(3), None);
        assert_eq!(Record::new(1, fields).at_position(1), Some(("B", &CellValue::text("2"))));
    }
}
