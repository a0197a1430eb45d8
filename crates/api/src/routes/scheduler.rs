//! Carbon-aware job schedules

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use spectra_lib::intensity::ForecastHour;
use spectra_lib::scheduler::{JobPatch, NewJob};
use spectra_lib::ScheduledJob;

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/jobs", get(list).post(create))
        .route("/jobs/:id", patch(update))
        .route("/jobs/:id/accept", post(accept))
        .route("/forecast", get(forecast))
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    /// Greenest region at the sim clock when absent
    region: Option<String>,
}

async fn list(State(state): State<SharedState>) -> ApiResult<Json<Vec<ScheduledJob>>> {
    Ok(Json(state.scheduler.list().await?))
}

async fn create(
    State(state): State<SharedState>,
    Json(body): Json<NewJob>,
) -> ApiResult<Json<ScheduledJob>> {
    Ok(Json(state.scheduler.create(body).await?))
}

async fn update(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<JobPatch>,
) -> ApiResult<Json<ScheduledJob>> {
    Ok(Json(state.scheduler.patch(id, body).await?))
}

async fn accept(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ScheduledJob>> {
    Ok(Json(state.scheduler.accept_recommendation(id).await?))
}

async fn forecast(
    State(state): State<SharedState>,
    Query(query): Query<ForecastQuery>,
) -> ApiResult<Json<Vec<ForecastHour>>> {
    let sim_now = state.clock.now().await?;
    Ok(Json(
        state
            .scheduler
            .forecast(query.region.as_deref(), sim_now)
            .await?,
    ))
}
