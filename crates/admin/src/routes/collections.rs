//! Raw document browser.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use skincare_admin_core::Document;

use crate::{error::AppError, services::collections, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/collections", get(index))
        .route("/api/collections/{name}", get(show))
        .route("/api/collections/{name}/{doc_id}", get(show_document))
}

/// GET /api/collections
async fn index() -> Json<[&'static str; 5]> {
    Json(collections::known_collections())
}

/// GET /api/collections/{name}
async fn show(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(collections::browse_collection(state.data(), &name).await?))
}

/// GET /api/collections/{name}/{doc_id}
async fn show_document(
    State(state): State<AppState>,
    Path((name, doc_id)): Path<(String, String)>,
) -> Result<Json<Document>, AppError> {
    collections::browse_document(state.data(), &name, &doc_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{name}/{doc_id}")))
}
