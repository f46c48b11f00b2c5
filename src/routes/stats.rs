use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(overview))
}

async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    Ok(ok(state.stats_service().overview(today).await?))
}
