use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::response::{ok, AppError};
use crate::routes::{path_id, query_or_reject};
use crate::services::problems::ProblemQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_problems))
        .route("/categories", get(categories))
        .route("/:problem_id", get(get_problem))
}

async fn list_problems(
    State(state): State<AppState>,
    query: Result<Query<ProblemQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = query_or_reject(query)?;
    let page = state.problem_service().list(&query).await?;
    Ok(ok(page))
}

async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.problem_service().categories().await?))
}

async fn get_problem(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let problem_id = path_id(path, "problem_id")?;
    Ok(ok(state.problem_service().get(problem_id).await?))
}
