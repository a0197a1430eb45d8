//! Carbon-intensity signals and latency readings per region

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use spectra_lib::intensity::{LatestSignals, DEFAULT_HISTORY_HOURS};
use spectra_lib::latency::RegionLatency;
use spectra_lib::{CarbonIntensityHour, LatencyMetric};

use super::SharedState;
use crate::ApiResult;

const DEFAULT_LATENCY_DAYS: i64 = 90;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/signals/latest", get(latest_signals))
        .route("/signals/history", get(signal_history))
        .route("/latency/latest", get(latest_latency))
        .route("/latency/history", get(latency_history))
}

#[derive(Debug, Deserialize)]
struct SignalHistoryQuery {
    code: String,
    hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LatencyHistoryQuery {
    code: String,
    days: Option<i64>,
}

async fn latest_signals(State(state): State<SharedState>) -> ApiResult<Json<LatestSignals>> {
    let sim_now = state.clock.now().await?;
    Ok(Json(state.intensity.latest_signals(sim_now).await?))
}

async fn signal_history(
    State(state): State<SharedState>,
    Query(query): Query<SignalHistoryQuery>,
) -> ApiResult<Json<Vec<CarbonIntensityHour>>> {
    let sim_now = state.clock.now().await?;
    let hours = query.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    Ok(Json(
        state.intensity.history(&query.code, hours, sim_now).await?,
    ))
}

async fn latest_latency(State(state): State<SharedState>) -> ApiResult<Json<Vec<RegionLatency>>> {
    Ok(Json(state.latency.latest().await?))
}

/// Latency is real-world telemetry, so its window is wall-clock based
async fn latency_history(
    State(state): State<SharedState>,
    Query(query): Query<LatencyHistoryQuery>,
) -> ApiResult<Json<Vec<LatencyMetric>>> {
    let days = query.days.unwrap_or(DEFAULT_LATENCY_DAYS);
    Ok(Json(
        state.latency.history(&query.code, days, Utc::now()).await?,
    ))
}
