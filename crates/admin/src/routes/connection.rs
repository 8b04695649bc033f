//! Store connection status and manual retry.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{store::ConnectionStatus, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/connection", get(status))
        .route("/api/connection/retry", post(retry))
}

/// GET /api/connection
async fn status(State(state): State<AppState>) -> Json<ConnectionStatus> {
    Json(state.data().connections().status().await)
}

/// Re-run the connection initializer and report the new status.
///
/// POST /api/connection/retry
async fn retry(State(state): State<AppState>) -> Json<ConnectionStatus> {
    let connections = state.data().connections();
    let connection = connections.reconnect().await;
    tracing::info!(degraded = connection.is_degraded(), "Store connection retried");
    Json(connections.status().await)
}
