//! Header record type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field name holding the instance number used to order series members.
pub const INSTANCE_NUMBER: &str = "InstanceNumber";

/// Flat mapping from header field keyword to scalar (or multi-valued) value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderRecord {
    fields: BTreeMap<String, Value>,
}

impl HeaderRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Returns a field's value, treating JSON null as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Returns a field rendered as text, as used in identifiers.
    ///
    /// Strings are returned verbatim, numbers in their shortest decimal
    /// form and lists joined with the DICOM multi-value delimiter `\`.
    pub fn get_text(&self, field: &str) -> Option<String> {
        self.get(field).map(value_to_text)
    }

    /// Returns the instance number if the record carries a numeric one.
    pub fn instance_number(&self) -> Option<f64> {
        self.get(INSTANCE_NUMBER).and_then(Value::as_f64)
    }

    /// Iterates over field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Consumes the record into its underlying map.
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.fields
    }
}

impl From<BTreeMap<String, Value>> for HeaderRecord {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for HeaderRecord {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("\\"),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_treats_null_as_absent() {
        let record = HeaderRecord::new()
            .with("ProtocolName", "T1")
            .with("SeriesNumber", Value::Null);
        assert!(record.get("ProtocolName").is_some());
        assert!(record.get("SeriesNumber").is_none());
        assert!(record.get("StudyID").is_none());
    }

    #[test]
    fn test_get_text() {
        let record = HeaderRecord::new()
            .with("ProtocolName", "T1 MPRAGE")
            .with("SeriesNumber", 7)
            .with("EchoTime", 2.5)
            .with("ImageType", json!(["ORIGINAL", "PRIMARY"]));
        assert_eq!(record.get_text("ProtocolName").unwrap(), "T1 MPRAGE");
        assert_eq!(record.get_text("SeriesNumber").unwrap(), "7");
        assert_eq!(record.get_text("EchoTime").unwrap(), "2.5");
        assert_eq!(record.get_text("ImageType").unwrap(), "ORIGINAL\\PRIMARY");
    }

    #[test]
    fn test_instance_number_requires_number() {
        assert_eq!(
            HeaderRecord::new().with(INSTANCE_NUMBER, 3).instance_number(),
            Some(3.0)
        );
        assert_eq!(
            HeaderRecord::new().with(INSTANCE_NUMBER, "3").instance_number(),
            None
        );
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let record = HeaderRecord::new().with("A", 1).with("B", "x");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"A": 1, "B": "x"}));
        let back: HeaderRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
