//! Skin analysis view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::document::Document;

/// One skin analysis result (`users/{userId}/skinAnalysis/{id}`).
///
/// Scores are read as floats; absent scores are `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinAnalysis {
    pub id: String,
    pub firmness: f64,
    pub pores: f64,
    pub pimples: f64,
    pub redness: f64,
    pub sagging: f64,
    pub skin_age: f64,
    pub skin_grade: f64,
    pub image_path: String,
    pub analysis_results: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl SkinAnalysis {
    /// Build an analysis view from a raw document.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        let score = |name: &str| doc.f64_field(name).unwrap_or_default();
        Self {
            id: doc.id.clone(),
            firmness: score("firmness"),
            pores: score("pores"),
            pimples: score("pimples"),
            redness: score("redness"),
            sagging: score("sagging"),
            skin_age: score("skinAge"),
            skin_grade: score("skinGrade"),
            image_path: doc.string_or_default("imagePath"),
            analysis_results: doc.string_or_default("analysisResults"),
            timestamp: doc.timestamp_field("timestamp"),
        }
    }
}
