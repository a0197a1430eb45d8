//! Scope summaries, monthly history and the downloadable report

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use spectra_lib::reports::{MonthlyEmissions, ReportSummary, ScopeSelection};

use super::SharedState;
use crate::ApiResult;

const DEFAULT_PERIOD: &str = "current";

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/history", get(history))
        .route("/export", get(export))
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    period: Option<String>,
    scope1: Option<bool>,
    scope2: Option<bool>,
    scope3: Option<bool>,
}

impl SummaryQuery {
    fn selection(&self) -> ScopeSelection {
        ScopeSelection {
            scope1: self.scope1.unwrap_or(true),
            scope2: self.scope2.unwrap_or(true),
            scope3: self.scope3.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PeriodQuery {
    period: Option<String>,
}

async fn summary(
    State(state): State<SharedState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<ReportSummary>> {
    let sim_now = state.clock.now().await?;
    let period = query.period.as_deref().unwrap_or(DEFAULT_PERIOD);
    Ok(Json(
        state
            .reports
            .summary(period, query.selection(), sim_now)
            .await?,
    ))
}

async fn history(State(state): State<SharedState>) -> ApiResult<Json<Vec<MonthlyEmissions>>> {
    let sim_now = state.clock.now().await?;
    Ok(Json(state.reports.history(sim_now).await?))
}

async fn export(
    State(state): State<SharedState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<impl IntoResponse> {
    let sim_now = state.clock.now().await?;
    let period = query.period.unwrap_or_else(|| DEFAULT_PERIOD.to_string());
    let report = state.reports.export(&period, sim_now).await?;
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"spectra_report_{period}.json\""),
        )],
        Json(report),
    ))
}
