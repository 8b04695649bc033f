//! Skincare Admin library.
//!
//! Data access for the skincare analysis admin dashboard, exposed as a JSON
//! API. Reads go through a native store connection when one can be
//! established and fall back to a read-only REST path otherwise.
//!
//! # Security
//!
//! This crate holds store credentials with write access to user and product
//! data. Only deploy on private infrastructure; there is no login layer.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod data;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the application router with request tracing.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        #[allow(clippy::cast_possible_truncation)]
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
