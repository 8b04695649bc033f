//! Skin-analysis prompt singleton and its history.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::document::Document;

/// The operative prompt (`settings/skin_analysis_prompt`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSetting {
    pub prompt: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PromptSetting {
    /// Build from the singleton document. A missing document means an empty prompt.
    #[must_use]
    pub fn from_document(doc: Option<&Document>) -> Self {
        doc.map_or_else(Self::default, |doc| Self {
            prompt: doc.string_or_default("prompt"),
            updated_at: doc.timestamp_field("updatedAt"),
        })
    }
}

/// A previous prompt value (`settings/skin_analysis_prompt/history/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptHistoryEntry {
    pub id: String,
    pub prompt: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PromptHistoryEntry {
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            prompt: doc.string_or_default("prompt"),
            timestamp: doc.timestamp_field("timestamp"),
        }
    }

    /// Sort newest first; entries without a timestamp go last.
    pub fn sort_newest_first(entries: &mut [Self]) {
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldValue, Fields};

    fn entry(id: &str, ts: Option<&str>) -> PromptHistoryEntry {
        let mut fields = Fields::new();
        fields.insert("prompt".into(), FieldValue::from(id));
        if let Some(ts) = ts {
            fields.insert("timestamp".into(), FieldValue::from(ts));
        }
        PromptHistoryEntry::from_document(&Document::new(id, fields))
    }

    #[test]
    fn test_sort_newest_first() {
        let mut entries = vec![
            entry("old", Some("2024-01-01T00:00:00Z")),
            entry("none", None),
            entry("new", Some("2024-02-01T00:00:00Z")),
        ];
        PromptHistoryEntry::sort_newest_first(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "none"]);
    }

    #[test]
    fn test_missing_singleton_is_empty() {
        assert_eq!(PromptSetting::from_document(None), PromptSetting::default());
    }
}
