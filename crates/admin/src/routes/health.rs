//! Liveness and readiness probes.

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::{store::ConnectionStatus, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable only when neither the native nor the
/// degraded store is reachable; a degraded connection still serves reads.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.data().connections().status().await {
        ConnectionStatus::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
        ConnectionStatus::Native { .. } | ConnectionStatus::Degraded => StatusCode::OK,
    }
}
