//! Diagnostic data export.

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
};

use crate::{
    error::AppError,
    services::export::{self, ExportRequest},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/export", post(create))
}

/// POST /api/export
async fn create(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let csv = export::export_csv(state.data(), &request, state.stats_fetch_limit()).await?;
    let filename = format!(
        "attachment; filename=\"export_{}_{}.csv\"",
        request.start_date, request.end_date
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        csv,
    ))
}
