//! Manual triggers for import, clock ticks and latency refresh

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use spectra_lib::health::components;

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/import", post(import))
        .route("/tick", post(tick))
        .route("/latency/fetch-now", post(fetch_latency))
}

#[derive(Debug, Deserialize)]
struct TickQuery {
    hours: Option<i64>,
}

/// Regions first, then CSV snapshots, then the remaining demo data
async fn import(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    state.seeder.seed_regions().await?;

    let imported = state.importer.import_dir(&state.csv_dir).await;
    state.health.record(components::IMPORTER, &imported).await;
    let imported = imported?;

    let seeded = state.seeder.seed_all(Utc::now()).await?;
    Ok(Json(json!({
        "status": "Import triggered",
        "import": imported,
        "seeded": seeded,
    })))
}

async fn tick(
    State(state): State<SharedState>,
    Query(query): Query<TickQuery>,
) -> ApiResult<Json<Value>> {
    let sim_now = state.worker.tick_clock(query.hours.unwrap_or(1)).await?;
    Ok(Json(json!({ "status": "Ticked", "simNowUtc": sim_now })))
}

async fn fetch_latency(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let summary = state.worker.refresh_latency().await?;
    Ok(Json(json!({
        "status": "Latency fetch triggered",
        "regions": summary.regions,
        "fallbacks": summary.fallbacks,
    })))
}
