mod health;
mod problems;
mod progress;
mod reviews;
mod stats;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/progress", progress::router())
        .nest("/reviews", reviews::router())
        .nest("/problems", problems::router())
        .nest("/stats", stats::router());

    Router::new()
        .nest("/health", health::router())
        .nest("/api", api)
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}

/// Unwraps a numeric path id, turning extractor rejections into 400s.
pub(crate) fn path_id(
    path: Result<Path<i64>, PathRejection>,
    what: &str,
) -> Result<i64, AppError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(_) => Err(AppError::validation(format!("{what} must be an integer"))),
    }
}

pub(crate) fn query_or_reject<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    match query {
        Ok(Query(value)) => Ok(value),
        Err(rejection) => Err(AppError::validation(rejection.body_text())),
    }
}
