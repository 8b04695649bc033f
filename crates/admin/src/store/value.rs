//! Wire codec for typed store values.
//!
//! The store encodes every field as a single-key object naming its type:
//! `{"stringValue": "a"}`, `{"integerValue": "42"}`, `{"mapValue": {"fields": {..}}}`
//! and so on. Decoding unwraps these into [`FieldValue`]. Falsy values (`""`,
//! `0`, `false`) survive unchanged.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use skincare_admin_core::{Document, FieldValue, Fields};

use super::{StoreError, StoreResult};

/// A document as the store returns it.
#[derive(Debug, Deserialize)]
pub(crate) struct WireDocument {
    /// Full resource name, ending in `/{collection}/{id}`.
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl WireDocument {
    /// Unwrap into a normalized [`Document`] whose id is the last name segment.
    pub fn into_document(self) -> StoreResult<Document> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Parse(format!("document name without id: {}", self.name)))?
            .to_string();
        Ok(Document::new(id, decode_fields(&self.fields)?))
    }
}

/// Decode a wire field map.
///
/// # Errors
///
/// Returns [`StoreError::Parse`] if any value has an unknown or malformed type tag.
pub fn decode_fields(fields: &Map<String, Value>) -> StoreResult<Fields> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decode_value(value)?)))
        .collect()
}

/// Decode one typed wire value.
///
/// # Errors
///
/// Returns [`StoreError::Parse`] if the value has an unknown or malformed type tag.
pub fn decode_value(value: &Value) -> StoreResult<FieldValue> {
    let object = value
        .as_object()
        .ok_or_else(|| malformed("value", value))?;
    let Some((tag, inner)) = object.iter().next() else {
        return Err(malformed("value", value));
    };

    match tag.as_str() {
        "nullValue" => Ok(FieldValue::Null),
        "booleanValue" => inner
            .as_bool()
            .map(FieldValue::Boolean)
            .ok_or_else(|| malformed(tag, inner)),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse()
                .map(FieldValue::Integer)
                .map_err(|_| malformed(tag, inner)),
            Value::Number(n) => n.as_i64().map(FieldValue::Integer).ok_or_else(|| malformed(tag, inner)),
            _ => Err(malformed(tag, inner)),
        },
        "doubleValue" => match inner {
            Value::Number(n) => n.as_f64().map(FieldValue::Double).ok_or_else(|| malformed(tag, inner)),
            Value::String(s) => s
                .parse()
                .map(FieldValue::Double)
                .map_err(|_| malformed(tag, inner)),
            _ => Err(malformed(tag, inner)),
        },
        "timestampValue" => inner
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
            .ok_or_else(|| malformed(tag, inner)),
        "stringValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(|| malformed(tag, inner)),
        "geoPointValue" => {
            let point = inner.as_object().ok_or_else(|| malformed(tag, inner))?;
            let coordinate = |name: &str| {
                FieldValue::Double(point.get(name).and_then(Value::as_f64).unwrap_or_default())
            };
            Ok(FieldValue::Map(Fields::from([
                ("latitude".to_string(), coordinate("latitude")),
                ("longitude".to_string(), coordinate("longitude")),
            ])))
        }
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map_or(Ok(Vec::new()), |values| {
                values.iter().map(decode_value).collect()
            })
            .map(FieldValue::Array),
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map_or(Ok(Fields::new()), decode_fields)
            .map(FieldValue::Map),
        _ => Err(malformed(tag, inner)),
    }
}

/// Encode a field map into wire form.
#[must_use]
pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(name, value)| (name.clone(), encode_value(value)))
            .collect(),
    )
}

/// Encode one value into its typed wire form.
#[must_use]
pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(n) => json!({ "integerValue": n.to_string() }),
        FieldValue::Double(n) if n.is_finite() => json!({ "doubleValue": n }),
        FieldValue::Double(n) => {
            let text = if n.is_nan() {
                "NaN"
            } else if n.is_sign_positive() {
                "Infinity"
            } else {
                "-Infinity"
            };
            json!({ "doubleValue": text })
        }
        FieldValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Array(values) => {
            json!({ "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Quote a field name for use in field paths and update masks.
///
/// Simple identifiers pass through; anything else is wrapped in backticks
/// with backticks and backslashes escaped.
#[must_use]
pub fn quote_field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        return name.to_string();
    }

    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('`');
    for c in name.chars() {
        if c == '`' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('`');
    quoted
}

fn malformed(tag: &str, value: &Value) -> StoreError {
    StoreError::Parse(format!("malformed {tag}: {value}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_preserves_falsy_values() {
        let wire = json!({
            "name": { "stringValue": "" },
            "count": { "integerValue": "0" },
            "active": { "booleanValue": false },
            "score": { "doubleValue": 0.0 },
            "note": { "nullValue": null },
        });
        let fields = decode_fields(wire.as_object().unwrap()).unwrap();

        assert_eq!(fields["name"], FieldValue::from(""));
        assert_eq!(fields["count"], FieldValue::Integer(0));
        assert_eq!(fields["active"], FieldValue::Boolean(false));
        assert_eq!(fields["score"], FieldValue::Double(0.0));
        assert_eq!(fields["note"], FieldValue::Null);
    }

    #[test]
    fn test_decode_nested_and_timestamps() {
        let wire = json!({
            "mapValue": { "fields": {
                "tags": { "arrayValue": { "values": [ { "stringValue": "保湿" } ] } },
                "empty": { "arrayValue": {} },
                "at": { "timestampValue": "2024-05-01T12:00:00.123456Z" },
                "ref": { "referenceValue": "projects/p/databases/(default)/documents/users/u1" },
            } }
        });
        let FieldValue::Map(fields) = decode_value(&wire).unwrap() else {
            panic!("expected map");
        };

        assert_eq!(fields["tags"], FieldValue::Array(vec![FieldValue::from("保湿")]));
        assert_eq!(fields["empty"], FieldValue::Array(vec![]));
        assert!(matches!(fields["at"], FieldValue::Timestamp(_)));
        assert!(matches!(fields["ref"], FieldValue::String(_)));
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        assert!(decode_value(&json!({ "mysteryValue": 1 })).is_err());
        assert!(decode_value(&json!({ "integerValue": "abc" })).is_err());
        assert!(decode_value(&json!("bare")).is_err());
    }

    #[test]
    fn test_encode_values() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            encode_value(&FieldValue::Integer(42)),
            json!({ "integerValue": "42" })
        );
        assert_eq!(
            encode_value(&FieldValue::Timestamp(ts)),
            json!({ "timestampValue": "2024-01-02T03:04:05.000000Z" })
        );
        assert_eq!(
            encode_value(&FieldValue::Double(f64::NAN)),
            json!({ "doubleValue": "NaN" })
        );
    }

    #[test]
    fn test_wire_document_id() {
        let doc: WireDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/products/abc",
            "fields": { "商品名": { "stringValue": "Toner" } },
            "createTime": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        let doc = doc.into_document().unwrap();
        assert_eq!(doc.id, "abc");
        assert_eq!(doc.str_field("商品名"), Some("Toner"));
    }

    #[test]
    fn test_quote_field_path() {
        assert_eq!(quote_field_path("createdAt"), "createdAt");
        assert_eq!(quote_field_path("_private1"), "_private1");
        assert_eq!(quote_field_path("商品名"), "`商品名`");
        assert_eq!(quote_field_path("容量・参考価格"), "`容量・参考価格`");
        assert_eq!(quote_field_path("a`b"), "`a\\`b`");
        assert_eq!(quote_field_path("1st"), "`1st`");
    }
}
