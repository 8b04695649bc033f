//! Analysis prompt management.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    error::AppError,
    services::prompts::{self, PromptOverview, UpdatePrompt},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/prompt", get(show).put(update))
        .route("/api/prompt/history/{id}/restore", post(restore))
}

/// GET /api/prompt
async fn show(State(state): State<AppState>) -> Json<PromptOverview> {
    Json(prompts::overview(state.data()).await)
}

/// PUT /api/prompt
async fn update(
    State(state): State<AppState>,
    Json(body): Json<UpdatePrompt>,
) -> Result<StatusCode, AppError> {
    prompts::update(state.data(), &body.prompt).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/prompt/history/{id}/restore
async fn restore(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    prompts::restore(state.data(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
