use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::{path_id, query_or_reject};
use crate::services::reviews::ReviewQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct TodayQuery {
    /// Reference date, `YYYY-MM-DD`. Defaults to the current UTC date.
    date: Option<NaiveDate>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews))
        .route("/today", get(today_reviews))
        .route("/:review_id/complete", put(complete_review))
}

async fn today_reviews(
    State(state): State<AppState>,
    query: Result<Query<TodayQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = query_or_reject(query)?;
    let today = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let buckets = state.review_service().get_reviews(today).await?;
    Ok(ok(buckets))
}

async fn list_reviews(
    State(state): State<AppState>,
    query: Result<Query<ReviewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = query_or_reject(query)?;
    let reviews = state.review_service().get_all_reviews(query).await?;
    Ok(ok(reviews))
}

async fn complete_review(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let review_id = path_id(path, "review_id")?;
    let plan = state
        .review_service()
        .complete_review(review_id, Utc::now())
        .await?;
    Ok(ok(plan))
}
