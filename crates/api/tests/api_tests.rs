//! Integration tests driving the router end to end

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use spectra_api::{create_router, AppState, StateOptions};
use spectra_lib::latency::{RadarClient, DEFAULT_RADAR_ENDPOINT};
use spectra_lib::{Catalog, EventLogger, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

async fn state_with(csv_dir: Option<PathBuf>) -> Arc<AppState> {
    let catalog = Arc::new(Catalog::builtin());
    let radar = RadarClient::new(
        catalog.clone(),
        DEFAULT_RADAR_ENDPOINT,
        None,
        EventLogger::default(),
    )
    .unwrap();
    let mut options = StateOptions::new(Arc::new(radar));
    if let Some(dir) = csv_dir {
        options.csv_dir = dir;
    }
    let state = Arc::new(AppState::new(MemoryStore::shared(), catalog, options).await);
    state
        .seeder
        .seed_all(Utc.with_ymd_and_hms(2025, 11, 3, 12, 0, 0).unwrap())
        .await
        .unwrap();
    state
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let state = state_with(None).await;
    (create_router(state.clone()), state)
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: Option<Value>) -> axum::response::Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = send_raw(app, method, uri, body).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = setup_test_app().await;
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["app"], "SPECTRA");
    assert_eq!(body["env"], "development");
}

#[tokio::test]
async fn test_readyz_follows_startup() {
    let (app, state) = setup_test_app().await;
    let (status, _) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    state.health.set_ready(true).await;
    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_healthz_lists_components() {
    let (app, _) = setup_test_app().await;
    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    for name in ["store", "sim_clock", "latency_feed", "importer"] {
        assert!(body["components"].get(name).is_some(), "missing {name}");
    }
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup_test_app().await;
    let response = send_raw(&app, Method::GET, "/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("spectra_"));
}

#[tokio::test]
async fn test_list_and_filter_instances() {
    let (app, _) = setup_test_app().await;
    let (status, body) = get(&app, "/api/instances").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 75);

    let (_, high) = get(&app, "/api/instances?risk=high").await;
    assert!(high
        .as_array()
        .unwrap()
        .iter()
        .all(|i| i["risk"] == "high"));
}

#[tokio::test]
async fn test_patch_instance_errors() {
    let (app, _) = setup_test_app().await;

    let (status, body) = send(&app, Method::PATCH, "/api/instances/999999", Some(json!({"team": "Ops"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, list) = get(&app, "/api/instances").await;
    let id = list[0]["id"].as_i64().unwrap();
    let (status, body) = send(&app, Method::PATCH, &format!("/api/instances/{id}"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_optimize_applies_once() {
    let (app, _) = setup_test_app().await;
    let (_, list) = get(&app, "/api/instances").await;
    let candidate = list
        .as_array()
        .unwrap()
        .iter()
        .find(|i| !i["recommendation"].is_null())
        .expect("seeded data has a rightsizing candidate")
        .clone();
    let id = candidate["id"].as_i64().unwrap();
    let target = candidate["recommendation"]["targetType"].clone();

    let uri = format!("/api/instances/{id}/optimize");
    let (status, body) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["optimized"], true);
    assert_eq!(body["instance"]["instanceType"], target);
    assert!(body["instance"]["recommendation"].is_null());
    assert_eq!(body["instance"]["risk"], "low");

    let (status, _) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_budget_conflict_and_export() {
    let (app, _) = setup_test_app().await;
    let new = json!({"team": "Backend", "allocated": 100.0, "quarterYear": "Q2-2030"});

    let (status, _) = send(&app, Method::POST, "/api/budgets", Some(new.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::POST, "/api/budgets", Some(new)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/budgets/Nobody",
        Some(json!({"allocated": 1.0, "quarterYear": "Q2-2030"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = send_raw(&app, Method::GET, "/api/budgets/export?quarter=Q1-2026", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("chargeback_Q1-2026.csv"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 1 + 5);
}

#[tokio::test]
async fn test_anomaly_action_updates_savings() {
    let (app, _) = setup_test_app().await;
    let (_, pending) = get(&app, "/api/anomalies?status=pending").await;
    let id = pending[0]["id"].as_i64().unwrap();
    let uri = format!("/api/anomalies/{id}/action");

    let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({"action": "snoozed"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({"action": "restarted"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["co2eSaved"], 12.0);

    let (_, stats) = get(&app, "/api/anomalies/stats").await;
    assert_eq!(stats["total"], 20);
}

#[tokio::test]
async fn test_admin_tick() {
    let (app, _) = setup_test_app().await;
    let (status, body) = send(&app, Method::POST, "/api/admin/tick?hours=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Ticked");
    assert_eq!(body["simNowUtc"], "2024-01-01T02:00:00Z");

    let (status, _) = send(&app, Method::POST, "/api/admin/tick?hours=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::POST, "/api/admin/tick?hours=1000000000000", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of range"));

    let (_, dashboard) = get(&app, "/api/dashboard/metrics").await;
    assert_eq!(dashboard["simNowUtc"], "2024-01-01T02:00:00Z");
}

#[tokio::test]
async fn test_history_windows_reject_out_of_range_values() {
    let (app, _) = setup_test_app().await;

    let (status, body) = get(&app, "/api/regions/signals/history?code=SE&hours=9000000000000000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = get(&app, "/api/regions/latency/history?code=US&days=4611686018427387903").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = get(&app, "/api/regions/latency/history?code=US").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_latency_fetch_uses_baseline() {
    let (app, _) = setup_test_app().await;
    let (status, body) = send(&app, Method::POST, "/api/admin/latency/fetch-now", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["regions"], 5);
    assert_eq!(body["fallbacks"], 5);

    let (_, latest) = get(&app, "/api/regions/latency/latest").await;
    let us = latest
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["code"] == "US")
        .unwrap()
        .clone();
    assert_eq!(us["latencyMs"], 20.0);
}

#[tokio::test]
async fn test_migration_validation_and_history() {
    let (app, _) = setup_test_app().await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/migrations/execute",
        Some(json!({"fromRegion": "US", "toRegion": "US"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/migrations/execute",
        Some(json!({"fromRegion": "XX", "toRegion": "SE"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, running_us) = get(&app, "/api/instances?region=US&status=RUNNING").await;
    let expected = running_us.as_array().unwrap().len();

    let (status, result) = send(
        &app,
        Method::POST,
        "/api/migrations/execute",
        Some(json!({"fromRegion": "US", "toRegion": "SE", "mode": "ALL_RUNNING"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["moved"], expected);

    let (_, history) = get(&app, "/api/migrations/history?limit=5").await;
    let audited = usize::from(result["audited"] == true);
    assert_eq!(history["total"], 8 + audited);
    assert_eq!(history["records"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_optimizer_has_single_optimal_region() {
    let (app, _) = setup_test_app().await;
    let (status, body) = get(&app, "/api/optimizer/regions").await;
    assert_eq!(status, StatusCode::OK);

    let regions = body.as_array().unwrap();
    assert_eq!(regions.len(), 5);
    let optimal: Vec<_> = regions
        .iter()
        .filter(|r| r["recommendation"]["type"] == "OPTIMAL")
        .collect();
    assert_eq!(optimal.len(), 1);
    assert_eq!(optimal[0]["regionCode"], "SE");
}

#[tokio::test]
async fn test_scheduler_forecast_and_accept() {
    let (app, _) = setup_test_app().await;
    let (status, forecast) = get(&app, "/api/scheduler/forecast").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(forecast.as_array().unwrap().len(), 24);
    assert_eq!(forecast[0]["regionCode"], "SE");

    let (_, jobs) = get(&app, "/api/scheduler/jobs").await;
    let job = jobs
        .as_array()
        .unwrap()
        .iter()
        .find(|j| j["accepted"] == false)
        .unwrap()
        .clone();
    let uri = format!("/api/scheduler/jobs/{}/accept", job["id"]);

    let (_, first) = send(&app, Method::POST, &uri, None).await;
    let (_, second) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(first["currentSchedule"], job["recommendedSchedule"]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let (app, _) = setup_test_app().await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({"settings": {"alertChannel": "slack"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, patched) = send(
        &app,
        Method::PATCH,
        "/api/settings/defaultRegion",
        Some(json!({"value": "SE"})),
    )
    .await;
    assert_eq!(patched, json!({"defaultRegion": "SE"}));

    let (_, all) = get(&app, "/api/settings").await;
    assert_eq!(all["alertChannel"], "slack");
    assert_eq!(all["defaultRegion"], "SE");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({"settings": {"alertChannel": "pager", "\u{3000}": "x"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, all) = get(&app, "/api/settings").await;
    assert_eq!(all["alertChannel"], "slack");
}

#[tokio::test]
async fn test_report_export_is_attachment() {
    let (app, _) = setup_test_app().await;
    let response = send_raw(&app, Method::GET, "/api/reports/export?period=Q1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("spectra_report_Q1.json"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["history"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_dashboard_and_signals() {
    let (app, _) = setup_test_app().await;
    let (status, dashboard) = get(&app, "/api/dashboard/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["simNowUtc"], "2024-01-01T00:00:00Z");
    assert_eq!(dashboard["trend"], -12.5);

    let (_, signals) = get(&app, "/api/regions/signals/latest").await;
    assert_eq!(signals["regions"].as_array().unwrap().len(), 5);

    let (status, history) = get(&app, "/api/regions/signals/history?code=IE&hours=6").await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 7);
    assert_eq!(history[0]["timestampUtc"], "2023-12-31T18:00:00Z");
    assert_eq!(history[6]["timestampUtc"], "2024-01-01T00:00:00Z");

    let (status, _) = get(&app, "/api/regions/signals/history").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_import_reads_csv_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Ireland-2024.csv"),
        "Datetime (UTC),Carbon Intensity gCO2eq/kWh (direct)\n\
         2023-06-01T00:00:00Z,280.4\n\
         2023-06-01T01:00:00Z,275\n\
         bad,1\n",
    )
    .unwrap();

    let state = state_with(Some(dir.path().to_path_buf())).await;
    let app = create_router(state);
    let (status, body) = send(&app, Method::POST, "/api/admin/import", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Import triggered");
    assert_eq!(body["import"]["imported"], 2);
    assert_eq!(body["import"]["skipped"], 1);
    assert_eq!(body["seeded"]["instances"], 0);
}
