//! Bidirectional field-name mapping between stored labels and normalized names.
//!
//! Product documents were originally entered with Japanese column labels as
//! field names. The admin layer works with normalized camelCase names and
//! translates at the store boundary: stored → normalized on read, normalized →
//! stored on write. Keys missing from the table pass through unchanged.

use super::value::Fields;

/// A fixed table of `(stored label, normalized name)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pairs: &'static [(&'static str, &'static str)],
}

/// Field mapping for the `products` collection.
pub const PRODUCT_FIELDS: FieldMap = FieldMap::new(&[
    ("商品名", "productName"),
    ("ブランド名", "brand"),
    ("カテゴリ", "category"),
    ("商品詳細", "description"),
    ("成分", "ingredients"),
    ("商品画像URL", "imageUrl"),
    ("商品URL", "productUrl"),
    ("外部URL", "externalUrl"),
    ("評価スコア", "evaluationScore"),
    ("タグ", "tags"),
    ("口コミ件数", "reviewCount"),
    ("容量・参考価格", "volumePrice"),
]);

impl FieldMap {
    /// Create a mapping table.
    #[must_use]
    pub const fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        Self { pairs }
    }

    /// Normalized name for a stored label.
    #[must_use]
    pub fn normalized_name(&self, stored: &str) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(label, _)| *label == stored)
            .map(|(_, name)| *name)
    }

    /// Stored label for a normalized name.
    #[must_use]
    pub fn stored_name(&self, normalized: &str) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(_, name)| *name == normalized)
            .map(|(label, _)| *label)
    }

    /// Iterate over all stored labels in table order.
    pub fn stored_labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|(label, _)| *label)
    }

    /// Translate stored field names to normalized names.
    ///
    /// If a document carries both a stored label and its normalized name, the
    /// stored label's value wins.
    #[must_use]
    pub fn to_normalized(&self, fields: Fields) -> Fields {
        let (translated, passthrough): (Vec<_>, Vec<_>) = fields
            .into_iter()
            .partition(|(key, _)| self.normalized_name(key).is_some());

        let mut out: Fields = passthrough.into_iter().collect();
        for (key, value) in translated {
            if let Some(name) = self.normalized_name(&key) {
                out.insert(name.to_owned(), value);
            }
        }
        out
    }

    /// Translate normalized field names to stored labels.
    #[must_use]
    pub fn to_stored(&self, fields: Fields) -> Fields {
        fields
            .into_iter()
            .map(|(key, value)| match self.stored_name(&key) {
                Some(label) => (label.to_owned(), value),
                None => (key, value),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldValue;

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_lookup_both_directions() {
        assert_eq!(PRODUCT_FIELDS.normalized_name("商品名"), Some("productName"));
        assert_eq!(PRODUCT_FIELDS.stored_name("brand"), Some("ブランド名"));
        assert_eq!(PRODUCT_FIELDS.normalized_name("unknown"), None);
    }

    #[test]
    fn test_translation_round_trip() {
        let stored = fields(&[
            ("商品名", FieldValue::from("Toner")),
            ("評価スコア", FieldValue::Integer(4)),
            ("createdAt", FieldValue::from("2024-01-01T00:00:00Z")),
        ]);

        let normalized = PRODUCT_FIELDS.to_normalized(stored.clone());
        assert_eq!(normalized["productName"], FieldValue::from("Toner"));
        assert_eq!(normalized["evaluationScore"], FieldValue::Integer(4));
        assert!(normalized.contains_key("createdAt"));

        assert_eq!(PRODUCT_FIELDS.to_stored(normalized), stored);
    }

    #[test]
    fn test_stored_label_wins_on_collision() {
        let stored = fields(&[
            ("brand", FieldValue::from("old")),
            ("ブランド名", FieldValue::from("new")),
        ]);
        let normalized = PRODUCT_FIELDS.to_normalized(stored);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized["brand"], FieldValue::from("new"));
    }

    #[test]
    fn test_table_is_bijective() {
        let labels: Vec<_> = PRODUCT_FIELDS.stored_labels().collect();
        for label in &labels {
            let name = PRODUCT_FIELDS.normalized_name(label);
            assert_eq!(name.and_then(|n| PRODUCT_FIELDS.stored_name(n)), Some(*label));
        }
    }
}
