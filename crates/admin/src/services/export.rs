//! Diagnostic data export as CSV.
//!
//! Users whose latest analysis falls inside the requested date range are
//! joined with that analysis and written one row per user.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use skincare_admin_core::{SkinAnalysis, User};
use thiserror::Error;
use tracing::instrument;

use crate::data::{DataAccess, SKIN_ANALYSIS, USERS};
use crate::store::{CollectionPath, Order};

/// Selectable export sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportItem {
    UserInfo,
    DiagnosticResults,
    ProductRecommendations,
    ConsultationRecords,
    ChatHistory,
}

/// Export parameters; both dates are inclusive UTC days.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub items: Vec<ExportItem>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Select at least one item to export")]
    NoItems,

    #[error("Start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

impl ExportRequest {
    /// Check the request before any store access.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoItems`] or [`ExportError::InvalidRange`].
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.items.is_empty() {
            return Err(ExportError::NoItems);
        }
        if self.start_date > self.end_date {
            return Err(ExportError::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    fn includes(&self, item: ExportItem) -> bool {
        self.items.contains(&item)
    }

    fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start_date <= day && day <= self.end_date
    }
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn header(request: &ExportRequest) -> Vec<&'static str> {
    let mut columns = vec!["user_id"];
    if request.includes(ExportItem::UserInfo) {
        columns.extend(["display_name", "email", "created_at", "provider"]);
    }
    if request.includes(ExportItem::DiagnosticResults) {
        columns.extend([
            "analysis_id",
            "analyzed_at",
            "skin_age",
            "skin_grade",
            "firmness",
            "pores",
            "pimples",
            "redness",
            "sagging",
        ]);
    }
    columns
}

fn row(request: &ExportRequest, user: &User, analysis: Option<&SkinAnalysis>) -> Vec<String> {
    let mut cells = vec![user.id.clone()];
    if request.includes(ExportItem::UserInfo) {
        cells.extend([
            user.name_or_placeholder().to_string(),
            user.email.clone(),
            format_time(user.created_at),
            user.provider.clone(),
        ]);
    }
    if request.includes(ExportItem::DiagnosticResults) {
        match analysis {
            Some(a) => cells.extend([
                a.id.clone(),
                format_time(a.timestamp),
                a.skin_age.to_string(),
                a.skin_grade.to_string(),
                a.firmness.to_string(),
                a.pores.to_string(),
                a.pimples.to_string(),
                a.redness.to_string(),
                a.sagging.to_string(),
            ]),
            None => cells.extend(std::iter::repeat_n(String::new(), 9)),
        }
    }
    cells
}

/// Build the export CSV.
///
/// Only `user-info` and `diagnostic-results` have backing data; the other
/// items are accepted but add no columns.
///
/// # Errors
///
/// Returns a validation error before any store access, or a CSV error.
#[instrument(skip(data, request), fields(start = %request.start_date, end = %request.end_date))]
pub async fn export_csv(
    data: &DataAccess,
    request: &ExportRequest,
    user_limit: usize,
) -> Result<Vec<u8>, ExportError> {
    request.validate()?;

    let users: Vec<User> = match CollectionPath::parse(USERS) {
        Ok(users) => data
            .list(&users, user_limit, Order::newest_first("createdAt"))
            .await
            .iter()
            .map(User::from_document)
            .filter(|user| user.latest_analysis_date.is_some_and(|at| request.contains(at)))
            .collect(),
        Err(_) => Vec::new(),
    };

    let analyses = join_all(users.iter().map(|user| async move {
        let id = user.latest_analysis_id.as_deref()?;
        let path = CollectionPath::parse(USERS)
            .and_then(|c| c.doc(&user.id))
            .and_then(|d| d.collection(SKIN_ANALYSIS))
            .and_then(|c| c.doc(id))
            .ok()?;
        data.get(&path)
            .await
            .map(|doc| SkinAnalysis::from_document(&doc))
    }))
    .await;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header(request))?;
    for (user, analysis) in users.iter().zip(&analyses) {
        writer.write_record(row(request, user, analysis.as_ref()))?;
    }

    tracing::info!(rows = users.len(), "Export generated");
    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))
}
