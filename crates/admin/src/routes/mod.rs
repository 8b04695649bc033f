//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness
//! GET    /health/ready                         - Readiness (store reachable)
//!
//! # Connection
//! GET    /api/connection                       - Native / degraded / unreachable
//! POST   /api/connection/retry                 - Re-run the initializer
//!
//! # Dashboard
//! GET    /api/dashboard/stats                  - Counters
//! GET    /api/dashboard/trends                 - Last 7 days
//! GET    /api/dashboard/popular-products       - Top rated
//!
//! # Users
//! GET    /api/users                            - Newest users
//! POST   /api/users                            - Create account
//! GET    /api/users/{id}                       - User with analyses
//! DELETE /api/users/{id}                       - Delete profile (non-cascading)
//! GET    /api/users/{id}/analyses/{analysis_id}
//!
//! # Products
//! GET    /api/products?page_size&cursor&q      - Cursor page, optionally filtered
//! POST   /api/products                         - Create
//! POST   /api/products/import                  - CSV upsert
//! GET    /api/products/{id}
//!
//! # Prompt
//! GET    /api/prompt                           - Current + history
//! PUT    /api/prompt                           - Update (history kept)
//! POST   /api/prompt/history/{id}/restore
//!
//! # Browser
//! GET    /api/collections
//! GET    /api/collections/{name}
//! GET    /api/collections/{name}/{doc_id}
//!
//! # Export
//! POST   /api/export                           - text/csv
//! ```

pub mod collections;
pub mod connection;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod products;
pub mod prompt;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router (without state or outer layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(connection::router())
        .merge(dashboard::router())
        .merge(users::router())
        .merge(products::router())
        .merge(prompt::router())
        .merge(collections::router())
        .merge(export::router())
}
