//! User browsing, account creation and deletion.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use skincare_admin_core::{SkinAnalysis, User};
use tracing::instrument;

use crate::{
    data::{SKIN_ANALYSIS, USERS},
    error::AppError,
    services::accounts::{self, AccountError, CreateUserRequest, CreatedAccount},
    state::AppState,
    store::{CollectionPath, DocumentPath, Order},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(index).post(create))
        .route("/api/users/{id}", get(show).delete(destroy))
        .route("/api/users/{id}/analyses/{analysis_id}", get(show_analysis))
}

/// A user with their most recent analyses.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub user: User,
    pub analyses: Vec<SkinAnalysis>,
}

fn user_path(id: &str) -> Result<DocumentPath, AppError> {
    Ok(CollectionPath::parse(USERS)?.doc(id)?)
}

/// Newest users first, bounded.
///
/// GET /api/users
async fn index(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let users = CollectionPath::parse(USERS)?;
    let documents = state
        .data()
        .list(&users, state.stats_fetch_limit(), Order::newest_first("createdAt"))
        .await;
    Ok(Json(documents.iter().map(User::from_document).collect()))
}

/// POST /api/users
#[instrument(skip(state, request))]
async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedAccount>), AppError> {
    let provider = state.accounts().ok_or(AccountError::NotConfigured)?;
    let created = accounts::create_account(state.data(), provider, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/users/{id}
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserDetail>, AppError> {
    let path = user_path(&id)?;
    let document = state
        .data()
        .get(&path)
        .await
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    let analyses = state
        .data()
        .list(
            &path.collection(SKIN_ANALYSIS)?,
            state.stats_fetch_limit(),
            Order::newest_first("timestamp"),
        )
        .await;

    Ok(Json(UserDetail {
        user: User::from_document(&document),
        analyses: analyses.iter().map(SkinAnalysis::from_document).collect(),
    }))
}

/// Delete the profile document. Analyses under it are left in place.
///
/// DELETE /api/users/{id}
#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.data().delete(&user_path(&id)?).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/{id}/analyses/{analysis_id}
async fn show_analysis(
    State(state): State<AppState>,
    Path((id, analysis_id)): Path<(String, String)>,
) -> Result<Json<SkinAnalysis>, AppError> {
    let path = user_path(&id)?
        .collection(SKIN_ANALYSIS)?
        .doc(&analysis_id)?;
    state
        .data()
        .get(&path)
        .await
        .map(|doc| Json(SkinAnalysis::from_document(&doc)))
        .ok_or_else(|| AppError::NotFound(format!("analysis {analysis_id}")))
}
