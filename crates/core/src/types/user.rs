//! End-user profile view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::document::Document;

/// A registered end user of the skincare app (`users/{id}`).
///
/// Built leniently from a [`Document`]: missing or mistyped fields become
/// empty strings or `None` rather than errors, because user documents are
/// written by several clients with slightly different shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub provider: String,
    pub latest_analysis_id: Option<String>,
    pub latest_analysis_date: Option<DateTime<Utc>>,
}

impl User {
    /// Build a user view from a raw document.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            display_name: doc.string_or_default("displayName"),
            email: doc.string_or_default("email"),
            created_at: doc.timestamp_field("createdAt"),
            last_login_at: doc.timestamp_field("lastLoginAt"),
            last_updated_at: doc.timestamp_field("lastUpdatedAt"),
            photo_url: doc.string_or_default("photoURL"),
            provider: doc.string_or_default("provider"),
            latest_analysis_id: doc
                .str_field("latestAnalysisId")
                .filter(|id| !id.is_empty())
                .map(str::to_owned),
            latest_analysis_date: doc.timestamp_field("latestAnalysisDate"),
        }
    }

    /// Display name, falling back to a placeholder for anonymous accounts.
    #[must_use]
    pub fn name_or_placeholder(&self) -> &str {
        if self.display_name.is_empty() {
            "Unknown User"
        } else {
            &self.display_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldValue, Fields};
    use chrono::TimeZone;

    #[test]
    fn test_from_document_mixed_timestamp_encodings() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single();
        let mut fields = Fields::new();
        fields.insert("displayName".into(), FieldValue::from("Aiko"));
        fields.insert(
            "createdAt".into(),
            FieldValue::Timestamp(created.unwrap_or_default()),
        );
        fields.insert(
            "lastLoginAt".into(),
            FieldValue::from("2024-03-02T10:00:00Z"),
        );
        fields.insert("latestAnalysisId".into(), FieldValue::from(""));

        let user = User::from_document(&Document::new("u1", fields));
        assert_eq!(user.display_name, "Aiko");
        assert_eq!(user.created_at, created);
        assert!(user.last_login_at.is_some());
        assert_eq!(user.latest_analysis_id, None);
        assert_eq!(user.email, "");
    }

    #[test]
    fn test_name_placeholder() {
        let user = User::from_document(&Document::new("u2", Fields::new()));
        assert_eq!(user.name_or_placeholder(), "Unknown User");
    }
}
