//! First-boot demo data
//!
//! Every table is seeded only while it is empty, so running the seeder again
//! is harmless. Each table draws from its own seeded RNG, which keeps a table's
//! rows identical across runs even when other tables were already populated.

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::classifier::{classify_risk, recommend};
use crate::clock::SimClock;
use crate::error::Result;
use crate::estimator::{estimate_monthly_co2e, round1, round2, RegionIntensity};
use crate::models::{
    Anomaly, AnomalyAction, CarbonIntensityHour, Flexibility, Instance, InstanceFilter,
    InstanceStatus, LatencyMetric, MigrationAction, Region, ScheduledJob, Severity, TeamBudget,
};
use crate::store::SharedStore;

pub const DEFAULT_SEED: u64 = 42;

pub const SEED_INSTANCES: usize = 75;
/// Hours of intensity written before the sim clock's hour, and after it
const INTENSITY_HOURS_BEFORE: i64 = 47;
const INTENSITY_HOURS_AFTER: i64 = 24;
const LATENCY_HOURS: i64 = 12;
const SOURCE_SEED: &str = "seed";

/// Multiplier on a region's average intensity by hour of day
const DIURNAL: [f64; 24] = [
    1.15, 1.20, 1.18, 1.10, 1.05, 0.95, 0.85, 0.75, 0.70, 0.68, 0.70, 0.78, 0.82, 0.88, 0.90,
    0.92, 0.95, 1.00, 1.05, 1.10, 1.12, 1.14, 1.15, 1.15,
];

struct Scenario {
    prefix: &'static str,
    status: InstanceStatus,
    cpu: (f64, f64),
    memory: (f64, f64),
    weight: f64,
}

static SCENARIOS: [Scenario; 7] = [
    Scenario { prefix: "web-api", status: InstanceStatus::Running, cpu: (30.0, 70.0), memory: (40.0, 75.0), weight: 0.25 },
    Scenario { prefix: "ml-train", status: InstanceStatus::Running, cpu: (75.0, 98.0), memory: (60.0, 95.0), weight: 0.20 },
    Scenario { prefix: "etl-worker", status: InstanceStatus::Running, cpu: (10.0, 30.0), memory: (20.0, 50.0), weight: 0.20 },
    Scenario { prefix: "data-proc", status: InstanceStatus::Stopped, cpu: (0.0, 5.0), memory: (0.0, 10.0), weight: 0.10 },
    Scenario { prefix: "cache", status: InstanceStatus::Running, cpu: (5.0, 20.0), memory: (55.0, 85.0), weight: 0.10 },
    Scenario { prefix: "db-replica", status: InstanceStatus::Running, cpu: (15.0, 45.0), memory: (50.0, 80.0), weight: 0.10 },
    Scenario { prefix: "batch-job", status: InstanceStatus::Running, cpu: (8.0, 25.0), memory: (15.0, 40.0), weight: 0.05 },
];

static REGION_WEIGHTS: [(&str, f64); 5] =
    [("IN", 0.12), ("SE", 0.25), ("US", 0.30), ("IE", 0.20), ("JP", 0.13)];

const MIGRATIONS: [(&str, &str, u32); 8] = [
    ("US", "SE", 12),
    ("IN", "SE", 8),
    ("JP", "IE", 5),
    ("US", "IE", 7),
    ("IN", "US", 3),
    ("JP", "SE", 10),
    ("US", "IE", 4),
    ("IN", "SE", 6),
];

/// (type, severity, expected range, actual multiplier range, action)
type AnomalyProfile = (&'static str, Severity, (f64, f64), (f64, f64), AnomalyAction);

static ANOMALIES: [AnomalyProfile; 20] = [
    ("high_cpu", Severity::High, (30.0, 55.0), (3.0, 6.0), AnomalyAction::AutoKilled),
    ("memory_spike", Severity::High, (40.0, 60.0), (2.5, 5.0), AnomalyAction::Restarted),
    ("network_burst", Severity::Medium, (20.0, 40.0), (4.0, 8.0), AnomalyAction::Alerted),
    ("disk_io", Severity::Medium, (15.0, 35.0), (3.0, 7.0), AnomalyAction::Alerted),
    ("high_cpu", Severity::Low, (10.0, 25.0), (2.0, 3.5), AnomalyAction::Pending),
    ("memory_spike", Severity::Medium, (25.0, 45.0), (2.0, 4.0), AnomalyAction::Pending),
    ("network_burst", Severity::High, (50.0, 80.0), (2.0, 3.0), AnomalyAction::AutoKilled),
    ("disk_io", Severity::Low, (10.0, 20.0), (2.5, 5.0), AnomalyAction::Alerted),
    ("high_cpu", Severity::High, (60.0, 80.0), (1.5, 2.5), AnomalyAction::Restarted),
    ("memory_spike", Severity::Low, (20.0, 35.0), (1.5, 3.0), AnomalyAction::Pending),
    ("network_burst", Severity::Low, (10.0, 30.0), (2.0, 4.0), AnomalyAction::Alerted),
    ("disk_io", Severity::High, (30.0, 60.0), (2.0, 4.0), AnomalyAction::AutoKilled),
    ("high_cpu", Severity::Medium, (40.0, 60.0), (1.5, 2.5), AnomalyAction::Restarted),
    ("memory_spike", Severity::High, (55.0, 75.0), (1.5, 2.0), AnomalyAction::AutoKilled),
    ("network_burst", Severity::Medium, (25.0, 45.0), (3.0, 6.0), AnomalyAction::Pending),
    ("disk_io", Severity::Medium, (20.0, 40.0), (2.0, 5.0), AnomalyAction::Alerted),
    ("high_cpu", Severity::Low, (5.0, 15.0), (2.0, 3.0), AnomalyAction::Pending),
    ("memory_spike", Severity::Low, (15.0, 30.0), (1.5, 2.5), AnomalyAction::Alerted),
    ("network_burst", Severity::High, (40.0, 70.0), (2.0, 3.5), AnomalyAction::AutoKilled),
    ("disk_io", Severity::Low, (8.0, 18.0), (3.0, 6.0), AnomalyAction::Pending),
];

/// (team, quarter, allocated kg, used kg at the time of allocation)
const BUDGETS: [(&str, &str, f64, f64); 15] = [
    ("DataScience", "Q3-2025", 4000.0, 3950.0),
    ("DataScience", "Q4-2025", 4200.0, 4180.0),
    ("DataScience", "Q1-2026", 4500.0, 3890.0),
    ("Backend", "Q3-2025", 2800.0, 2700.0),
    ("Backend", "Q4-2025", 2900.0, 2880.0),
    ("Backend", "Q1-2026", 3000.0, 2340.0),
    ("Frontend", "Q3-2025", 1200.0, 1100.0),
    ("Frontend", "Q4-2025", 1400.0, 1390.0),
    ("Frontend", "Q1-2026", 1500.0, 980.0),
    ("Ops", "Q3-2025", 1800.0, 1750.0),
    ("Ops", "Q4-2025", 1900.0, 1850.0),
    ("Ops", "Q1-2026", 2000.0, 1200.0),
    ("ML-Training", "Q3-2025", 4800.0, 4790.0),
    ("ML-Training", "Q4-2025", 4900.0, 4880.0),
    ("ML-Training", "Q1-2026", 5000.0, 4750.0),
];

/// (name, team, current, recommended, duration h, savings kg, flexibility, accepted)
type JobRow = (&'static str, &'static str, &'static str, &'static str, f64, f64, Flexibility, bool);

const JOBS: [JobRow; 8] = [
    ("Daily ETL Pipeline", "DataScience", "09:00 UTC", "22:00 UTC", 2.0, 52.0, Flexibility::Batch, false),
    ("ML Model Training", "ML-Training", "14:00 UTC", "03:00 UTC", 4.0, 68.0, Flexibility::Flexible, true),
    ("Database Backup", "Ops", "00:00 UTC", "04:00 UTC", 1.0, 23.0, Flexibility::Flexible, false),
    ("Weekly Report Generation", "DataScience", "08:00 UTC Mon", "23:00 UTC Sun", 1.5, 41.0, Flexibility::Batch, false),
    ("Hourly Metrics Aggregation", "Backend", "Every hour", "Every hour (green window 01-05)", 0.25, 18.0, Flexibility::Flexible, false),
    ("Feature Store Refresh", "ML-Training", "06:00 UTC", "01:00 UTC", 3.0, 85.0, Flexibility::Flexible, true),
    ("Log Archival", "Ops", "12:00 UTC", "03:00 UTC", 0.5, 14.0, Flexibility::Batch, false),
    ("A/B Test Analysis", "Frontend", "10:00 UTC", "22:00 UTC", 1.0, 30.0, Flexibility::Batch, false),
];

/// Rows written per table by one seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub regions: usize,
    pub intensity_hours: usize,
    pub latency_metrics: usize,
    pub instances: usize,
    pub migrations: usize,
    pub anomalies: usize,
    pub budgets: usize,
    pub jobs: usize,
    pub settings: usize,
}

#[derive(Clone)]
pub struct Seeder {
    store: SharedStore,
    catalog: Arc<Catalog>,
    clock: SimClock,
    seed: u64,
}

impl Seeder {
    pub fn new(store: SharedStore, catalog: Arc<Catalog>, clock: SimClock) -> Self {
        Self {
            store,
            catalog,
            clock,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn rng(&self, table: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(table))
    }

    /// Upsert every catalog region as enabled
    pub async fn seed_regions(&self) -> Result<usize> {
        for spec in self.catalog.regions() {
            self.store
                .upsert_region(Region {
                    code: spec.code.clone(),
                    display_name: spec.display_name.clone(),
                    enabled: true,
                })
                .await?;
        }
        Ok(self.catalog.regions().len())
    }

    /// Seed every empty table
    ///
    /// Intensity is laid out around the sim clock; latency, migrations and
    /// anomalies around `now`.
    pub async fn seed_all(&self, now: DateTime<Utc>) -> Result<SeedReport> {
        let sim_now = self.clock.now().await?;
        let report = SeedReport {
            regions: self.seed_regions().await?,
            intensity_hours: self.seed_intensity(sim_now).await?,
            latency_metrics: self.seed_latency(now).await?,
            instances: self.seed_instances().await?,
            migrations: self.seed_migrations(now).await?,
            anomalies: self.seed_anomalies(now).await?,
            budgets: self.seed_budgets().await?,
            jobs: self.seed_jobs().await?,
            settings: self.seed_settings().await?,
        };
        tracing::info!(
            event = "seed_completed",
            instances = report.instances,
            intensity_hours = report.intensity_hours,
            "Seeding finished"
        );
        Ok(report)
    }

    async fn seed_intensity(&self, sim_now: DateTime<Utc>) -> Result<usize> {
        if self.store.count_intensity().await? > 0 {
            return Ok(0);
        }
        let mut rng = self.rng(1);
        let anchor = truncate_hour(sim_now);
        let mut rows = Vec::new();
        for region in self.catalog.regions() {
            for (h, offset) in (-INTENSITY_HOURS_BEFORE..=INTENSITY_HOURS_AFTER).enumerate() {
                let at = anchor + Duration::hours(offset);
                let multiplier = DIURNAL[at.hour() as usize];
                let value = region.average_intensity as f64 * multiplier * rng.gen_range(0.92..1.08);
                rows.push(CarbonIntensityHour {
                    id: 0,
                    region_code: region.code.clone(),
                    timestamp_utc: at,
                    carbon_intensity: value.round() as i32,
                    raw_row_json: json!({"region": region.code, "hour": h, "source": SOURCE_SEED})
                        .to_string(),
                });
            }
        }
        self.store.insert_intensity_batch(rows).await
    }

    async fn seed_latency(&self, now: DateTime<Utc>) -> Result<usize> {
        if self.store.count_latency().await? > 0 {
            return Ok(0);
        }
        let mut rng = self.rng(2);
        let anchor = truncate_hour(now);
        let mut written = 0;
        for region in self.catalog.regions() {
            for h in 0..LATENCY_HOURS {
                let latency_ms = round1(region.base_latency_ms * rng.gen_range(0.85..1.25));
                self.store
                    .insert_latency(LatencyMetric {
                        id: 0,
                        region_code: region.code.clone(),
                        timestamp_utc: anchor - Duration::hours(LATENCY_HOURS - 1 - h),
                        latency_ms,
                        source: SOURCE_SEED.to_string(),
                        raw_json: json!({"region": region.code, "latency_ms": latency_ms})
                            .to_string(),
                    })
                    .await?;
                written += 1;
            }
        }
        Ok(written)
    }

    async fn seed_instances(&self) -> Result<usize> {
        if self.store.count_instances().await? > 0 {
            return Ok(0);
        }
        let catalog = &self.catalog;
        let mut rng = self.rng(3);
        for i in 0..SEED_INSTANCES {
            let scenario = SCENARIOS
                .choose_weighted(&mut rng, |s| s.weight)
                .unwrap_or(&SCENARIOS[0]);
            let region_code = REGION_WEIGHTS
                .choose_weighted(&mut rng, |(_, w)| *w)
                .map_or("US", |(code, _)| *code);
            let Some(instance_type) = catalog.instance_types().choose(&mut rng) else {
                break;
            };
            let team = catalog
                .teams()
                .choose(&mut rng)
                .cloned()
                .unwrap_or_default();
            let cpu = round1(rng.gen_range(scenario.cpu.0..=scenario.cpu.1));
            let memory = round1(rng.gen_range(scenario.memory.0..=scenario.memory.1));
            let co2e = estimate_monthly_co2e(
                catalog,
                &instance_type.name,
                &RegionIntensity::average(catalog, region_code),
                cpu,
            );
            let recommendation =
                recommend(catalog, &instance_type.name, cpu, memory, co2e, &mut rng);

            self.store
                .insert_instance(Instance {
                    id: 0,
                    name: format!("{}-{}-{:03}", team.to_lowercase(), scenario.prefix, i + 1),
                    region_code: region_code.to_string(),
                    instance_type: instance_type.name.clone(),
                    cost_per_hour: instance_type.cost_per_hour,
                    team,
                    status: scenario.status,
                    cpu_utilization: cpu,
                    memory_utilization: memory,
                    co2e_per_month: co2e,
                    recommendation,
                    risk: classify_risk(&catalog.thresholds, cpu, memory),
                })
                .await?;
        }
        self.store.count_instances().await
    }

    async fn seed_migrations(&self, now: DateTime<Utc>) -> Result<usize> {
        if self.store.list_migrations(1, 0).await?.1 > 0 {
            return Ok(0);
        }
        let mut rng = self.rng(4);
        for (from, to, moved) in MIGRATIONS {
            self.store
                .insert_migration(MigrationAction {
                    id: 0,
                    from_region: from.to_string(),
                    to_region: to.to_string(),
                    moved_count: moved,
                    executed_at_utc: now - Duration::hours(rng.gen_range(1..=720)),
                })
                .await?;
        }
        Ok(MIGRATIONS.len())
    }

    async fn seed_anomalies(&self, now: DateTime<Utc>) -> Result<usize> {
        if !self.store.list_anomalies().await?.is_empty() {
            return Ok(0);
        }
        let instances = self.store.list_instances(&InstanceFilter::default()).await?;
        let instances = &instances[..instances.len().min(ANOMALIES.len())];
        if instances.is_empty() {
            tracing::warn!("No instances to attach seeded anomalies to, skipping");
            return Ok(0);
        }

        let mut rng = self.rng(5);
        for (i, (kind, severity, expected, multiplier, action)) in ANOMALIES.iter().enumerate() {
            let instance = &instances[i % instances.len()];
            let expected_value = round1(rng.gen_range(expected.0..=expected.1));
            let mut anomaly = Anomaly {
                id: 0,
                instance_id: format!("i-{:016x}", instance.id),
                instance_name: instance.name.clone(),
                detected_at_utc: now - Duration::minutes(rng.gen_range(5..=1440)),
                anomaly_type: kind.to_string(),
                score: round2(rng.gen_range(0.60..=0.99)),
                expected_value,
                actual_value: round1(expected_value * rng.gen_range(multiplier.0..=multiplier.1)),
                severity: *severity,
                action: AnomalyAction::Pending,
                co2e_saved: 0.0,
            };
            anomaly.set_action(*action);
            self.store.insert_anomaly(anomaly).await?;
        }
        Ok(ANOMALIES.len())
    }

    async fn seed_budgets(&self) -> Result<usize> {
        if !self.store.list_budgets(None).await?.is_empty() {
            return Ok(0);
        }
        for (team, quarter, allocated, used) in BUDGETS {
            self.store
                .insert_budget(TeamBudget {
                    id: 0,
                    team: team.to_string(),
                    quarter_year: quarter.to_string(),
                    allocated,
                    used_snapshot: used,
                })
                .await?;
        }
        Ok(BUDGETS.len())
    }

    async fn seed_jobs(&self) -> Result<usize> {
        if !self.store.list_jobs().await?.is_empty() {
            return Ok(0);
        }
        for (name, team, current, recommended, duration, savings, flexibility, accepted) in JOBS {
            self.store
                .insert_job(ScheduledJob {
                    id: 0,
                    name: name.to_string(),
                    team: team.to_string(),
                    current_schedule: current.to_string(),
                    recommended_schedule: recommended.to_string(),
                    duration_hours: duration,
                    carbon_savings: savings,
                    flexibility,
                    accepted,
                })
                .await?;
        }
        Ok(JOBS.len())
    }

    async fn seed_settings(&self) -> Result<usize> {
        let mut written = 0;
        for (key, value) in self.catalog.default_settings() {
            if self.store.insert_setting_if_absent(key, value).await? {
                written += 1;
            }
        }
        Ok(written)
    }
}

fn truncate_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::hours(1)).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_start;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn seeder(store: &SharedStore) -> Seeder {
        let start = parse_start("2024-01-01T00:30:00Z").unwrap();
        Seeder::new(
            store.clone(),
            Arc::new(Catalog::builtin()),
            SimClock::new(store.clone(), start),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, 14, 20, 0).unwrap()
    }

    #[tokio::test]
    async fn test_seed_all_populates_every_table() {
        let store = MemoryStore::shared();
        let report = seeder(&store).seed_all(now()).await.unwrap();

        assert_eq!(report.regions, 5);
        assert_eq!(report.intensity_hours, 5 * 72);
        assert_eq!(report.latency_metrics, 5 * 12);
        assert_eq!(report.instances, SEED_INSTANCES);
        assert_eq!(report.migrations, 8);
        assert_eq!(report.anomalies, 20);
        assert_eq!(report.budgets, 15);
        assert_eq!(report.jobs, 8);
        assert_eq!(report.settings, Catalog::builtin().default_settings().len());
        assert!(store.sim_now().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let store = MemoryStore::shared();
        let seeder = seeder(&store);
        seeder.seed_all(now()).await.unwrap();

        let again = seeder.seed_all(now()).await.unwrap();
        assert_eq!(
            again,
            SeedReport {
                regions: 5,
                ..SeedReport::default()
            }
        );
        assert_eq!(store.count_instances().await.unwrap(), SEED_INSTANCES);
    }

    #[tokio::test]
    async fn test_instances_are_deterministic() {
        let a = MemoryStore::shared();
        let b = MemoryStore::shared();
        seeder(&a).seed_all(now()).await.unwrap();
        seeder(&b).seed_all(now()).await.unwrap();

        let all = InstanceFilter::default();
        assert_eq!(
            a.list_instances(&all).await.unwrap(),
            b.list_instances(&all).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_intensity_covers_sim_hour_and_forecast() {
        let store = MemoryStore::shared();
        seeder(&store).seed_all(now()).await.unwrap();

        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for code in ["IN", "SE", "US", "IE", "JP"] {
            assert!(store.intensity_at(code, hour).await.unwrap().is_some());
            let ahead = store.intensity_from(code, hour, 24).await.unwrap();
            assert_eq!(ahead.len(), 24);
        }
    }

    #[tokio::test]
    async fn test_seeded_instances_are_consistent() {
        let store = MemoryStore::shared();
        seeder(&store).seed_all(now()).await.unwrap();
        let catalog = Catalog::builtin();

        for instance in store.list_instances(&InstanceFilter::default()).await.unwrap() {
            assert_eq!(
                instance.risk,
                classify_risk(
                    &catalog.thresholds,
                    instance.cpu_utilization,
                    instance.memory_utilization
                )
            );
            if let Some(rec) = &instance.recommendation {
                assert_eq!(
                    catalog.rightsizing_target(&instance.instance_type),
                    Some(rec.target_type.as_str())
                );
            }
        }
    }

    #[tokio::test]
    async fn test_anomaly_savings_follow_action() {
        let store = MemoryStore::shared();
        seeder(&store).seed_all(now()).await.unwrap();
        for anomaly in store.list_anomalies().await.unwrap() {
            assert_eq!(anomaly.co2e_saved, anomaly.action.co2e_saved());
        }
    }
}
