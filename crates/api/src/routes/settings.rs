use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use spectra_lib::SpectraError;
use std::collections::BTreeMap;

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_all).put(put_all))
        .route("/test-connection", post(test_connection))
        .route("/:key", patch(set_one))
}

#[derive(Debug, Deserialize)]
struct BulkSettings {
    settings: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SettingValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ConnectionCheck {
    service: String,
}

#[derive(Debug, Serialize)]
struct ConnectionResult {
    service: String,
    status: &'static str,
    message: String,
}

async fn get_all(State(state): State<SharedState>) -> ApiResult<Json<BTreeMap<String, String>>> {
    Ok(Json(state.settings.get_all().await?))
}

async fn put_all(
    State(state): State<SharedState>,
    Json(body): Json<BulkSettings>,
) -> ApiResult<Json<BTreeMap<String, String>>> {
    Ok(Json(state.settings.put_all(body.settings).await?))
}

async fn set_one(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(body): Json<SettingValue>,
) -> ApiResult<Json<BTreeMap<String, String>>> {
    Ok(Json(state.settings.set(&key, &body.value).await?))
}

/// Demo-mode connectivity check; no external call is made
async fn test_connection(Json(body): Json<ConnectionCheck>) -> ApiResult<Json<ConnectionResult>> {
    if body.service.trim().is_empty() {
        return Err(SpectraError::validation("service field is required").into());
    }
    Ok(Json(ConnectionResult {
        message: format!("{} connection test passed (demo mode)", body.service),
        service: body.service,
        status: "ok",
    }))
}
