//! Product catalog: cursor pages, creation and CSV import.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use skincare_admin_core::{NewProduct, Product};
use tracing::instrument;

use crate::{
    data::Page,
    error::AppError,
    services::{
        ValidationError,
        csv_import::{self, ImportReport},
    },
    state::AppState,
};

/// Page size when the query omits one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(index).post(create))
        .route("/api/products/import", post(import))
        .route("/api/products/{id}", get(show))
}

/// Pagination and search query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page_size: Option<usize>,
    pub cursor: Option<String>,
    /// Name, brand or category filter applied to the fetched page.
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedProduct {
    pub id: String,
}

/// A cursor page of products. With `q`, only matching products of the page
/// are returned; the cursor still advances over the unfiltered page.
///
/// GET /api/products?page_size&cursor&q
async fn index(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Json<Page<Product>> {
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let mut page = state
        .data()
        .list_products_page(page_size, query.cursor.as_deref().filter(|c| !c.is_empty()))
        .await;
    if let Some(q) = query.q.as_deref() {
        page.documents.retain(|product| product.matches_search(q));
    }
    Json(page)
}

/// GET /api/products/{id}
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    state
        .data()
        .get_product(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Create a product from normalized field names.
///
/// POST /api/products
#[instrument(skip(state, product))]
async fn create(
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<CreatedProduct>), AppError> {
    if let Some(field) = product.missing_required() {
        return Err(ValidationError::Required(field).into());
    }
    let id = state.data().create_product(product).await?;
    tracing::info!(product_id = %id, "Product created");
    Ok((StatusCode::CREATED, Json(CreatedProduct { id })))
}

/// Upsert products from a CSV body.
///
/// POST /api/products/import
async fn import(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    Ok(Json(csv_import::import_products(state.data(), &body).await?))
}
