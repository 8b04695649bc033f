//! Bulk product import from CSV.
//!
//! The header row must name every required column. Columns may use either
//! the stored (Japanese) labels or the normalized names; both are written
//! under the stored labels. An optional `id` column selects the document to
//! merge into; rows without one get a generated id.

use serde::Serialize;
use skincare_admin_core::product::split_tags;
use skincare_admin_core::{FieldValue, Fields, PRODUCT_FIELDS};
use thiserror::Error;
use tracing::instrument;

use crate::data::{DataAccess, PRODUCTS, auto_id};
use crate::store::CollectionPath;

/// Columns every header must contain (stored labels).
pub const REQUIRED_COLUMNS: [&str; 3] = ["商品名", "ブランド名", "カテゴリ"];

const ID_COLUMN: &str = "id";
const SCORE_COLUMN: &str = "評価スコア";
const REVIEW_COUNT_COLUMN: &str = "口コミ件数";
const TAGS_COLUMN: &str = "タグ";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors that abort an import before any write.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file is not readable CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Header row lacks required columns.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// One accepted row, ready to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    /// 1-based line number in the file (header is line 1).
    pub line: usize,
    pub id: String,
    /// Fields keyed by stored label.
    pub fields: Fields,
}

/// Parsed file: accepted rows, the lines skipped for empty required cells,
/// and the rows that could not be decoded.
#[derive(Debug, Default)]
pub struct ParsedImport {
    pub rows: Vec<ImportRow>,
    pub skipped_lines: Vec<usize>,
    pub unreadable: Vec<RowFailure>,
}

/// A row that could not be decoded or written. `id` is empty when the row
/// was never decoded.
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub line: usize,
    pub id: String,
    pub error: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: Vec<RowFailure>,
}

/// Parse a product CSV without touching the store.
///
/// Empty optional cells are left out so a merge keeps the stored value.
///
/// # Errors
///
/// Returns [`ImportError::MissingColumns`] if a required column is absent, or
/// [`ImportError::Csv`] if the header row is malformed. Malformed data rows
/// are collected in [`ParsedImport::unreadable`].
pub fn parse_products_csv(input: &[u8]) -> Result<ParsedImport, ImportError> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| PRODUCT_FIELDS.stored_name(h).unwrap_or(h).to_string())
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h.as_str() == **column))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let mut parsed = ParsedImport::default();
    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                parsed.unreadable.push(RowFailure {
                    line,
                    id: String::new(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        let cells: Vec<(&str, &str)> = headers
            .iter()
            .map(String::as_str)
            .zip(record.iter())
            .collect();

        let required_present = REQUIRED_COLUMNS.iter().all(|column| {
            cells
                .iter()
                .any(|(header, value)| header == column && !value.is_empty())
        });
        if !required_present {
            parsed.skipped_lines.push(line);
            continue;
        }

        let mut id = None;
        let mut fields = Fields::new();
        for (header, value) in cells {
            if value.is_empty() {
                continue;
            }
            if header == ID_COLUMN {
                id = Some(value.to_string());
                continue;
            }
            fields.insert(header.to_string(), cell_value(header, value));
        }

        parsed.rows.push(ImportRow {
            line,
            id: id.unwrap_or_else(auto_id),
            fields,
        });
    }
    Ok(parsed)
}

/// Typed value for a cell; numeric columns fall back to text when unparseable.
fn cell_value(header: &str, value: &str) -> FieldValue {
    match header {
        SCORE_COLUMN => value
            .parse::<f64>()
            .map_or_else(|_| FieldValue::from(value), FieldValue::Double),
        REVIEW_COUNT_COLUMN => value
            .replace(',', "")
            .parse::<i64>()
            .map_or_else(|_| FieldValue::from(value), FieldValue::Integer),
        TAGS_COLUMN => FieldValue::Array(split_tags(value).into_iter().map(FieldValue::String).collect()),
        _ => FieldValue::from(value),
    }
}

/// Parse and merge-upsert every accepted row concurrently.
///
/// # Errors
///
/// Returns [`ImportError`] if the file fails validation; per-row write
/// failures are reported in [`ImportReport::failed`].
#[instrument(skip(data, input), fields(bytes = input.len()))]
pub async fn import_products(data: &DataAccess, input: &[u8]) -> Result<ImportReport, ImportError> {
    let parsed = parse_products_csv(input)?;
    let mut report = ImportReport {
        skipped: parsed.skipped_lines.len(),
        failed: parsed.unreadable,
        ..ImportReport::default()
    };

    let mut pending = Vec::new();
    let mut writes = Vec::new();
    for row in parsed.rows {
        match CollectionPath::parse(PRODUCTS).and_then(|products| products.doc(&row.id)) {
            Ok(document) => {
                pending.push((row.line, row.id));
                writes.push((document, row.fields));
            }
            Err(e) => report.failed.push(RowFailure {
                line: row.line,
                id: row.id,
                error: e.to_string(),
            }),
        }
    }

    let results = data.bulk_upsert(writes).await;
    for ((line, id), result) in pending.into_iter().zip(results) {
        match result {
            Ok(()) => report.imported += 1,
            Err(e) => {
                tracing::warn!(line, id = %id, error = %e, "Product row import failed");
                report.failed.push(RowFailure {
                    line,
                    id,
                    error: e.to_string(),
                });
            }
        }
    }
    report.failed.sort_by_key(|failure| failure.line);

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        failed = report.failed.len(),
        "Product import finished"
    );
    Ok(report)
}
