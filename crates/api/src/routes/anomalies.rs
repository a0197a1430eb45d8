use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use spectra_lib::anomalies::{AnomalyStats, AnomalyStatus, NewAnomaly};
use spectra_lib::Anomaly;

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/stats", get(stats))
        .route("/:id/action", patch(set_action))
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    status: Option<AnomalyStatus>,
}

#[derive(Debug, Deserialize)]
struct ActionBody {
    action: String,
}

async fn list(
    State(state): State<SharedState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Vec<Anomaly>>> {
    Ok(Json(state.anomalies.list(query.status).await?))
}

async fn create(
    State(state): State<SharedState>,
    Json(body): Json<NewAnomaly>,
) -> ApiResult<Json<Anomaly>> {
    Ok(Json(state.anomalies.create(body).await?))
}

async fn stats(State(state): State<SharedState>) -> ApiResult<Json<AnomalyStats>> {
    Ok(Json(state.anomalies.stats().await?))
}

async fn set_action(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<ActionBody>,
) -> ApiResult<Json<Anomaly>> {
    Ok(Json(state.anomalies.set_action(id, &body.action).await?))
}
