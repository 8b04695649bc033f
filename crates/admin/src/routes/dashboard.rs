//! Dashboard figures.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use skincare_admin_core::Product;

use crate::{
    services::analytics::{self, DailyTrend, DashboardStats, POPULAR_PRODUCTS},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/stats", get(stats))
        .route("/api/dashboard/trends", get(trends))
        .route("/api/dashboard/popular-products", get(popular_products))
}

/// GET /api/dashboard/stats
async fn stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(analytics::dashboard_stats(state.data(), Utc::now(), state.stats_fetch_limit()).await)
}

/// GET /api/dashboard/trends
async fn trends(State(state): State<AppState>) -> Json<Vec<DailyTrend>> {
    Json(analytics::trends(state.data(), Utc::now(), state.stats_fetch_limit()).await)
}

/// GET /api/dashboard/popular-products
async fn popular_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(
        analytics::popular_products(state.data(), state.stats_fetch_limit(), POPULAR_PRODUCTS)
            .await,
    )
}
