use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::path_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct UpdateProgressRequest {
    status: String,
    mastery_level: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:problem_id", get(get_progress).put(update_progress))
        .route("/:problem_id/complete", post(mark_complete))
}

async fn mark_complete(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let problem_id = path_id(path, "problem_id")?;
    let record = state
        .progress_service()
        .mark_complete(problem_id, Utc::now())
        .await?;
    Ok(ok(record))
}

async fn update_progress(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let problem_id = path_id(path, "problem_id")?;
    let payload: UpdateProgressRequest = serde_json::from_slice(&body)
        .map_err(|err| AppError::validation(format!("invalid request body: {err}")))?;

    let record = state
        .progress_service()
        .update_progress(problem_id, &payload.status, payload.mastery_level, Utc::now())
        .await?;
    Ok(ok(record))
}

async fn get_progress(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let problem_id = path_id(path, "problem_id")?;
    let record = state.progress_service().get_progress(problem_id).await?;
    Ok(ok(record))
}
