use axum::{extract::State, routing::get, Json, Router};
use spectra_lib::reports::DashboardMetrics;

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new().route("/metrics", get(metrics))
}

async fn metrics(State(state): State<SharedState>) -> ApiResult<Json<DashboardMetrics>> {
    let sim_now = state.clock.now().await?;
    Ok(Json(state.reports.dashboard(sim_now).await?))
}
