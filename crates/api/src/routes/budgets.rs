//! Team budgets and the chargeback export

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use spectra_lib::budgets::{quarter_label, BudgetView, NewBudget};
use spectra_lib::TeamBudget;

use super::SharedState;
use crate::ApiResult;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/export", get(export))
        .route("/:team", put(update))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuarterQuery {
    /// Defaults to the current wall-clock quarter
    quarter: Option<String>,
}

impl QuarterQuery {
    fn resolve(self) -> String {
        self.quarter.unwrap_or_else(|| quarter_label(Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BudgetUpdate {
    allocated: f64,
    quarter_year: Option<String>,
}

async fn list(
    State(state): State<SharedState>,
    Query(query): Query<QuarterQuery>,
) -> ApiResult<Json<Vec<BudgetView>>> {
    Ok(Json(state.budgets.list(&query.resolve()).await?))
}

async fn create(
    State(state): State<SharedState>,
    Json(body): Json<NewBudget>,
) -> ApiResult<Json<TeamBudget>> {
    Ok(Json(state.budgets.create(body, Utc::now()).await?))
}

async fn update(
    State(state): State<SharedState>,
    Path(team): Path<String>,
    Json(body): Json<BudgetUpdate>,
) -> ApiResult<Json<TeamBudget>> {
    let quarter = body
        .quarter_year
        .unwrap_or_else(|| quarter_label(Utc::now()));
    Ok(Json(
        state.budgets.update(&team, body.allocated, &quarter).await?,
    ))
}

async fn export(
    State(state): State<SharedState>,
    Query(query): Query<QuarterQuery>,
) -> ApiResult<impl IntoResponse> {
    let quarter = query.resolve();
    let csv = state.budgets.export_csv(&quarter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=chargeback_{quarter}.csv"),
            ),
        ],
        csv,
    ))
}
