//! Product catalog views.
//!
//! Products are read through [`PRODUCT_FIELDS`](super::field_map::PRODUCT_FIELDS)
//! first, so every accessor here uses normalized field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::Document;
use super::value::{FieldValue, Fields};

/// A catalog product built from a normalized document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub ingredients: String,
    pub image_url: String,
    pub product_url: String,
    pub external_url: String,
    pub evaluation_score: Option<f64>,
    pub tags: Vec<String>,
    pub review_count: Option<i64>,
    pub volume_price: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Build a product view from a document whose fields are already normalized.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            product_name: doc.string_or_default("productName"),
            brand: doc.string_or_default("brand"),
            category: doc.string_or_default("category"),
            description: doc.string_or_default("description"),
            ingredients: doc.string_or_default("ingredients"),
            image_url: doc.string_or_default("imageUrl"),
            product_url: doc.string_or_default("productUrl"),
            external_url: doc.string_or_default("externalUrl"),
            evaluation_score: doc.f64_field("evaluationScore"),
            tags: doc.get("tags").map(tags_from_value).unwrap_or_default(),
            review_count: doc.get("reviewCount").and_then(FieldValue::as_i64),
            volume_price: doc.string_or_default("volumePrice"),
            created_at: doc.timestamp_field("createdAt"),
        }
    }

    /// Case-insensitive match on name, brand or category.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.product_name.to_lowercase().contains(&q)
            || self.brand.to_lowercase().contains(&q)
            || self.category.to_lowercase().contains(&q)
    }
}

/// Tags are stored either as an array or as a comma-separated string.
fn tags_from_value(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::Array(values) => values
            .iter()
            .filter_map(FieldValue::as_str)
            .map(str::to_owned)
            .collect(),
        FieldValue::String(s) => split_tags(s),
        _ => Vec::new(),
    }
}

/// Split a comma-separated tag list, trimming blanks.
#[must_use]
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', '、'])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Input for creating a product from the admin form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProduct {
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub ingredients: String,
    pub image_url: String,
    pub product_url: String,
    pub external_url: String,
    pub evaluation_score: Option<f64>,
    pub tags: Vec<String>,
    pub review_count: Option<i64>,
    pub volume_price: String,
}

impl NewProduct {
    /// Normalized name of the first required field left blank.
    #[must_use]
    pub fn missing_required(&self) -> Option<&'static str> {
        [
            ("productName", &self.product_name),
            ("brand", &self.brand),
            ("category", &self.category),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }

    /// Normalized field map for this product. Empty optional text fields are
    /// kept as empty strings, matching how the form submits them.
    #[must_use]
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        let mut text = |name: &str, value: String| {
            fields.insert(name.to_owned(), FieldValue::String(value));
        };
        text("productName", self.product_name);
        text("brand", self.brand);
        text("category", self.category);
        text("description", self.description);
        text("ingredients", self.ingredients);
        text("imageUrl", self.image_url);
        text("productUrl", self.product_url);
        text("externalUrl", self.external_url);
        text("volumePrice", self.volume_price);

        if let Some(score) = self.evaluation_score {
            fields.insert("evaluationScore".to_owned(), FieldValue::Double(score));
        }
        if let Some(count) = self.review_count {
            fields.insert("reviewCount".to_owned(), FieldValue::Integer(count));
        }
        fields.insert(
            "tags".to_owned(),
            FieldValue::Array(self.tags.into_iter().map(FieldValue::String).collect()),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_from_string_and_array() {
        assert_eq!(split_tags("保湿, 美白、,敏感肌"), vec!["保湿", "美白", "敏感肌"]);

        let mut fields = Fields::new();
        fields.insert(
            "tags".into(),
            FieldValue::Array(vec![FieldValue::from("Hydration"), FieldValue::Integer(1)]),
        );
        let product = Product::from_document(&Document::new("p1", fields));
        assert_eq!(product.tags, vec!["Hydration"]);
    }

    #[test]
    fn test_matches_search() {
        let mut fields = Fields::new();
        fields.insert("productName".into(), FieldValue::from("Gentle Cleanser"));
        fields.insert("brand".into(), FieldValue::from("Curel"));
        let product = Product::from_document(&Document::new("p1", fields));

        assert!(product.matches_search("cleanser"));
        assert!(product.matches_search(" CUREL "));
        assert!(!product.matches_search("toner"));
    }

    #[test]
    fn test_missing_required() {
        let mut product = NewProduct {
            product_name: "Serum".into(),
            brand: "  ".into(),
            ..NewProduct::default()
        };
        assert_eq!(product.missing_required(), Some("brand"));

        product.brand = "Hada Labo".into();
        product.category = "Serum".into();
        assert_eq!(product.missing_required(), None);
        assert_eq!(NewProduct::default().missing_required(), Some("productName"));
    }

    #[test]
    fn test_new_product_fields() {
        let fields = NewProduct {
            product_name: "Serum".into(),
            evaluation_score: Some(4.5),
            tags: vec!["Vitamin C".into()],
            ..NewProduct::default()
        }
        .into_fields();

        assert_eq!(fields["productName"], FieldValue::from("Serum"));
        assert_eq!(fields["evaluationScore"], FieldValue::Double(4.5));
        assert!(!fields.contains_key("reviewCount"));
        assert_eq!(
            fields["tags"],
            FieldValue::Array(vec![FieldValue::from("Vitamin C")])
        );
    }
}
