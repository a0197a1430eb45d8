//! Shared application state

use chrono::{DateTime, Utc};
use spectra_lib::anomalies::AnomalyService;
use spectra_lib::budgets::BudgetService;
use spectra_lib::clock::{parse_start, DEFAULT_SIM_START};
use spectra_lib::ingest::CsvImporter;
use spectra_lib::instances::InstanceService;
use spectra_lib::intensity::IntensityService;
use spectra_lib::latency::{LatencyService, LatencySource};
use spectra_lib::optimizer::MigrationPlanner;
use spectra_lib::reports::ReportService;
use spectra_lib::scheduler::JobScheduler;
use spectra_lib::seed::Seeder;
use spectra_lib::settings::SettingsService;
use spectra_lib::worker::{BackgroundWorker, WorkerConfig};
use spectra_lib::{Catalog, EventLogger, HealthRegistry, SharedStore, SimClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Inputs that differ between the service binary and tests
pub struct StateOptions {
    pub sim_start: DateTime<Utc>,
    pub csv_dir: PathBuf,
    pub app_env: String,
    pub latency_source: Arc<dyn LatencySource>,
    pub worker: WorkerConfig,
    pub cors_origins: Vec<String>,
}

impl StateOptions {
    pub fn new(latency_source: Arc<dyn LatencySource>) -> Self {
        Self {
            sim_start: parse_start(DEFAULT_SIM_START).unwrap_or_default(),
            csv_dir: PathBuf::from("./data/electricitymaps"),
            app_env: "development".to_string(),
            latency_source,
            worker: WorkerConfig::default(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub catalog: Arc<Catalog>,
    pub clock: SimClock,
    pub health: HealthRegistry,
    pub logger: EventLogger,
    pub app_env: String,
    pub csv_dir: PathBuf,
    pub cors_origins: Vec<String>,

    pub instances: InstanceService,
    pub budgets: BudgetService,
    pub anomalies: AnomalyService,
    pub intensity: IntensityService,
    pub latency: LatencyService,
    pub planner: MigrationPlanner,
    pub scheduler: JobScheduler,
    pub reports: ReportService,
    pub settings: SettingsService,
    pub importer: CsvImporter,
    pub seeder: Seeder,
    pub worker: BackgroundWorker,
}

impl AppState {
    pub async fn new(store: SharedStore, catalog: Arc<Catalog>, options: StateOptions) -> Self {
        let logger = EventLogger::new(options.app_env.clone());
        let health = HealthRegistry::with_components().await;
        let clock = SimClock::new(store.clone(), options.sim_start);
        let intensity = IntensityService::new(store.clone(), catalog.clone());
        let latency =
            LatencyService::new(store.clone(), catalog.clone(), options.latency_source);

        Self {
            instances: InstanceService::new(
                store.clone(),
                catalog.clone(),
                clock.clone(),
                logger.clone(),
            ),
            budgets: BudgetService::new(store.clone()),
            anomalies: AnomalyService::new(store.clone()),
            planner: MigrationPlanner::new(store.clone(), catalog.clone(), logger.clone()),
            scheduler: JobScheduler::new(store.clone(), intensity.clone()),
            reports: ReportService::new(store.clone(), catalog.clone()),
            settings: SettingsService::new(store.clone(), catalog.clone()),
            importer: CsvImporter::new(store.clone(), catalog.clone(), logger.clone()),
            seeder: Seeder::new(store.clone(), catalog.clone(), clock.clone()),
            worker: BackgroundWorker::new(
                clock.clone(),
                latency.clone(),
                health.clone(),
                logger.clone(),
                options.worker,
            ),
            intensity,
            latency,
            store,
            catalog,
            clock,
            health,
            logger,
            app_env: options.app_env,
            csv_dir: options.csv_dir,
            cors_origins: options.cors_origins,
        }
    }
}
