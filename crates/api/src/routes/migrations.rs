use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use spectra_lib::optimizer::{
    MigrationHistory, MigrationRequest, MigrationResult, DEFAULT_HISTORY_LIMIT,
};

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/execute", post(execute))
        .route("/history", get(history))
}

#[derive(Debug, Deserialize)]
struct Page {
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn execute(
    State(state): State<SharedState>,
    Json(body): Json<MigrationRequest>,
) -> ApiResult<Json<MigrationResult>> {
    Ok(Json(state.planner.execute(&body).await?))
}

async fn history(
    State(state): State<SharedState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<MigrationHistory>> {
    let limit = page.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(
        state
            .planner
            .history(limit, page.offset.unwrap_or(0))
            .await?,
    ))
}
