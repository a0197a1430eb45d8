use axum::{extract::State, routing::get, Json, Router};
use spectra_lib::optimizer::RankedRegion;

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new().route("/regions", get(regions))
}

async fn regions(State(state): State<SharedState>) -> ApiResult<Json<Vec<RankedRegion>>> {
    let sim_now = state.clock.now().await?;
    Ok(Json(state.planner.rank(sim_now).await?))
}
