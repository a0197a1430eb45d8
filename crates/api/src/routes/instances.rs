use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use spectra_lib::instances::{InstancePatch, OptimizeResult};
use spectra_lib::{Instance, InstanceFilter};

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list))
        .route("/:id", patch(update))
        .route("/:id/optimize", post(optimize))
}

async fn list(
    State(state): State<SharedState>,
    Query(filter): Query<InstanceFilter>,
) -> ApiResult<Json<Vec<Instance>>> {
    Ok(Json(state.instances.list(&filter).await?))
}

async fn update(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<InstancePatch>,
) -> ApiResult<Json<Instance>> {
    Ok(Json(state.instances.patch(id, body).await?))
}

/// Apply the pending rightsizing recommendation
async fn optimize(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<OptimizeResult>> {
    Ok(Json(state.instances.optimize(id).await?))
}
