//! Normalized document shape.

use serde::{Deserialize, Serialize};

use super::value::{FieldValue, Fields};

/// A document as returned by any store path: string id plus flattened fields.
///
/// Serializes as `{"id": "...", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    /// Create a document from an id and its fields.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// String field, or `None` when absent or not a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// String field cloned into an owned value, empty when absent.
    #[must_use]
    pub fn string_or_default(&self, name: &str) -> String {
        self.str_field(name).unwrap_or_default().to_owned()
    }

    /// Numeric field as a float.
    #[must_use]
    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    /// Timestamp field (native timestamp or RFC 3339 string).
    #[must_use]
    pub fn timestamp_field(&self, name: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.get(name).and_then(FieldValue::as_timestamp)
    }
}
