//! SPECTRA API - sustainability dashboard backend
//!
//! Seeds demo data, starts the background jobs and serves the HTTP API
//! until interrupted.

use anyhow::{Context, Result};
use chrono::Utc;
use spectra_api::config::ApiConfig;
use spectra_api::{serve, AppState, StateOptions};
use spectra_lib::clock::parse_start;
use spectra_lib::latency::RadarClient;
use spectra_lib::worker::WorkerConfig;
use spectra_lib::{Catalog, EventLogger, MemoryStore, SpectraMetrics};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting spectra-api");

    let config = ApiConfig::load()?;
    info!(env = %config.app_env, port = config.api_port, "Service configured");

    let catalog = Arc::new(Catalog::builtin());
    let store = MemoryStore::shared();
    let logger = EventLogger::new(config.app_env.clone());

    let radar = RadarClient::new(
        catalog.clone(),
        config.radar_endpoint.clone(),
        config.radar_token(),
        logger.clone(),
    )
    .context("failed to build radar client")?;
    if config.radar_token().is_none() {
        warn!("No radar API token configured, latency will use regional baselines");
    }

    let options = StateOptions {
        sim_start: parse_start(&config.sim_start).context("invalid SPECTRA_SIM_START")?,
        csv_dir: PathBuf::from(&config.csv_dir),
        app_env: config.app_env.clone(),
        latency_source: Arc::new(radar),
        worker: WorkerConfig::from_hours(
            config.sim_tick_interval_hours,
            config.latency_fetch_interval_hours,
        ),
        cors_origins: config.cors_origin_list(),
    };
    let state = Arc::new(AppState::new(store.clone(), catalog, options).await);

    if config.seed_on_startup {
        let report = state
            .seeder
            .seed_all(Utc::now())
            .await
            .context("startup seeding failed")?;
        info!(instances = report.instances, "Startup seeding done");
    }

    let sim_now = state.clock.now().await.context("sim clock unavailable")?;
    SpectraMetrics::new().set_sim_time(sim_now.timestamp());

    if store.count_latency().await? == 0 {
        if let Err(e) = state.worker.refresh_latency().await {
            warn!(error = %e, "Initial latency fetch failed");
        }
    }

    logger.log_startup(VERSION, &sim_now.to_rfc3339());
    state.health.set_ready(true).await;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let worker_handle = tokio::spawn(state.worker.clone().run(shutdown_tx.subscribe()));

    serve(config.api_port, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await?;

    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "Background worker ended abnormally");
    }
    info!("Shutting down");

    Ok(())
}
