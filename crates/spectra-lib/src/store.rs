//! Storage abstraction and the in-process store
//!
//! Every read and write the domain performs goes through [`Store`]. Each call
//! is atomic on its own; there are no multi-call transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{
    Anomaly, CarbonIntensityHour, Instance, InstanceFilter, InstanceStatus, LatencyMetric,
    MigrationAction, Region, ScheduledJob, Setting, TeamBudget,
};

/// Persistence operations required by the domain services.
///
/// `insert_*` methods ignore the `id` of the value passed in and return the
/// stored value carrying its assigned id.
#[async_trait]
pub trait Store: Send + Sync {
    // Regions
    async fn list_regions(&self) -> Result<Vec<Region>>;
    async fn upsert_region(&self, region: Region) -> Result<()>;

    // Instances
    async fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<Instance>>;
    async fn get_instance(&self, id: i64) -> Result<Option<Instance>>;
    async fn insert_instance(&self, instance: Instance) -> Result<Instance>;
    async fn update_instance(&self, instance: &Instance) -> Result<()>;
    /// Move every RUNNING instance in `from` to `to`, returning the count moved
    async fn reassign_running(&self, from: &str, to: &str) -> Result<u32>;
    async fn count_instances(&self) -> Result<usize>;

    // Carbon intensity
    async fn insert_intensity_batch(&self, rows: Vec<CarbonIntensityHour>) -> Result<usize>;
    /// Row whose timestamp equals `at` exactly (first inserted wins)
    async fn intensity_at(
        &self,
        region: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<CarbonIntensityHour>>;
    /// Up to `limit` rows with timestamp >= `from`, ascending
    async fn intensity_from(
        &self,
        region: &str,
        from: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CarbonIntensityHour>>;
    /// Rows with `from <= timestamp <= until`, ascending
    async fn intensity_between(
        &self,
        region: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CarbonIntensityHour>>;
    async fn count_intensity(&self) -> Result<usize>;

    // Latency
    async fn insert_latency(&self, metric: LatencyMetric) -> Result<LatencyMetric>;
    async fn latest_latency(&self, region: &str) -> Result<Option<LatencyMetric>>;
    /// Rows with timestamp >= `since`, ascending
    async fn latency_since(&self, region: &str, since: DateTime<Utc>)
        -> Result<Vec<LatencyMetric>>;
    async fn count_latency(&self) -> Result<usize>;

    // Simulation clock
    async fn sim_now(&self) -> Result<Option<DateTime<Utc>>>;
    async fn set_sim_now(&self, at: DateTime<Utc>) -> Result<()>;

    // Anomalies
    async fn list_anomalies(&self) -> Result<Vec<Anomaly>>;
    async fn get_anomaly(&self, id: i64) -> Result<Option<Anomaly>>;
    async fn insert_anomaly(&self, anomaly: Anomaly) -> Result<Anomaly>;
    async fn update_anomaly(&self, anomaly: &Anomaly) -> Result<()>;

    // Budgets
    async fn list_budgets(&self, quarter: Option<&str>) -> Result<Vec<TeamBudget>>;
    async fn find_budget(&self, team: &str, quarter: &str) -> Result<Option<TeamBudget>>;
    async fn insert_budget(&self, budget: TeamBudget) -> Result<TeamBudget>;
    async fn update_budget(&self, budget: &TeamBudget) -> Result<()>;

    // Migrations
    async fn insert_migration(&self, action: MigrationAction) -> Result<MigrationAction>;
    /// Newest first, with the total row count
    async fn list_migrations(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<MigrationAction>, usize)>;

    // Scheduled jobs
    async fn list_jobs(&self) -> Result<Vec<ScheduledJob>>;
    async fn get_job(&self, id: i64) -> Result<Option<ScheduledJob>>;
    async fn insert_job(&self, job: ScheduledJob) -> Result<ScheduledJob>;
    async fn update_job(&self, job: &ScheduledJob) -> Result<()>;

    // Settings
    async fn list_settings(&self) -> Result<Vec<Setting>>;
    async fn get_setting(&self, key: &str) -> Result<Option<Setting>>;
    async fn upsert_setting(&self, key: &str, value: &str) -> Result<Setting>;
    /// Insert only when the key is absent; returns whether a row was written
    async fn insert_setting_if_absent(&self, key: &str, value: &str) -> Result<bool>;
}

/// Shared handle used by every service
pub type SharedStore = Arc<dyn Store>;

#[derive(Debug, Default)]
struct Tables {
    regions: Vec<Region>,
    instances: BTreeMap<i64, Instance>,
    intensity: Vec<CarbonIntensityHour>,
    latency: Vec<LatencyMetric>,
    sim_now: Option<DateTime<Utc>>,
    anomalies: BTreeMap<i64, Anomaly>,
    budgets: BTreeMap<i64, TeamBudget>,
    migrations: Vec<MigrationAction>,
    jobs: BTreeMap<i64, ScheduledJob>,
    settings: BTreeMap<String, String>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store guarded by a single async RwLock
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_regions(&self) -> Result<Vec<Region>> {
        Ok(self.tables.read().await.regions.clone())
    }

    async fn upsert_region(&self, region: Region) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.regions.iter_mut().find(|r| r.code == region.code) {
            Some(existing) => *existing = region,
            None => tables.regions.push(region),
        }
        Ok(())
    }

    async fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<Instance>> {
        let tables = self.tables.read().await;
        Ok(tables
            .instances
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn get_instance(&self, id: i64) -> Result<Option<Instance>> {
        Ok(self.tables.read().await.instances.get(&id).cloned())
    }

    async fn insert_instance(&self, mut instance: Instance) -> Result<Instance> {
        let mut tables = self.tables.write().await;
        instance.id = tables.next_id();
        tables.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn update_instance(&self, instance: &Instance) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn reassign_running(&self, from: &str, to: &str) -> Result<u32> {
        let mut tables = self.tables.write().await;
        let mut moved = 0;
        for instance in tables.instances.values_mut() {
            if instance.region_code == from && instance.status == InstanceStatus::Running {
                instance.region_code = to.to_string();
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn count_instances(&self) -> Result<usize> {
        Ok(self.tables.read().await.instances.len())
    }

    async fn insert_intensity_batch(&self, rows: Vec<CarbonIntensityHour>) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let count = rows.len();
        for mut row in rows {
            row.id = tables.next_id();
            tables.intensity.push(row);
        }
        Ok(count)
    }

    async fn intensity_at(
        &self,
        region: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<CarbonIntensityHour>> {
        let tables = self.tables.read().await;
        Ok(tables
            .intensity
            .iter()
            .find(|r| r.region_code == region && r.timestamp_utc == at)
            .cloned())
    }

    async fn intensity_from(
        &self,
        region: &str,
        from: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CarbonIntensityHour>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<_> = tables
            .intensity
            .iter()
            .filter(|r| r.region_code == region && r.timestamp_utc >= from)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.timestamp_utc);
        rows.truncate(limit);
        Ok(rows)
    }

    async fn intensity_between(
        &self,
        region: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CarbonIntensityHour>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<_> = tables
            .intensity
            .iter()
            .filter(|r| {
                r.region_code == region && r.timestamp_utc >= from && r.timestamp_utc <= until
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.timestamp_utc);
        Ok(rows)
    }

    async fn count_intensity(&self) -> Result<usize> {
        Ok(self.tables.read().await.intensity.len())
    }

    async fn insert_latency(&self, mut metric: LatencyMetric) -> Result<LatencyMetric> {
        let mut tables = self.tables.write().await;
        metric.id = tables.next_id();
        tables.latency.push(metric.clone());
        Ok(metric)
    }

    async fn latest_latency(&self, region: &str) -> Result<Option<LatencyMetric>> {
        let tables = self.tables.read().await;
        Ok(tables
            .latency
            .iter()
            .filter(|m| m.region_code == region)
            .max_by_key(|m| (m.timestamp_utc, m.id))
            .cloned())
    }

    async fn latency_since(
        &self,
        region: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LatencyMetric>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<_> = tables
            .latency
            .iter()
            .filter(|m| m.region_code == region && m.timestamp_utc >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.timestamp_utc, m.id));
        Ok(rows)
    }

    async fn count_latency(&self) -> Result<usize> {
        Ok(self.tables.read().await.latency.len())
    }

    async fn sim_now(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.tables.read().await.sim_now)
    }

    async fn set_sim_now(&self, at: DateTime<Utc>) -> Result<()> {
        self.tables.write().await.sim_now = Some(at);
        Ok(())
    }

    async fn list_anomalies(&self) -> Result<Vec<Anomaly>> {
        Ok(self.tables.read().await.anomalies.values().cloned().collect())
    }

    async fn get_anomaly(&self, id: i64) -> Result<Option<Anomaly>> {
        Ok(self.tables.read().await.anomalies.get(&id).cloned())
    }

    async fn insert_anomaly(&self, mut anomaly: Anomaly) -> Result<Anomaly> {
        let mut tables = self.tables.write().await;
        anomaly.id = tables.next_id();
        tables.anomalies.insert(anomaly.id, anomaly.clone());
        Ok(anomaly)
    }

    async fn update_anomaly(&self, anomaly: &Anomaly) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.anomalies.insert(anomaly.id, anomaly.clone());
        Ok(())
    }

    async fn list_budgets(&self, quarter: Option<&str>) -> Result<Vec<TeamBudget>> {
        let tables = self.tables.read().await;
        Ok(tables
            .budgets
            .values()
            .filter(|b| quarter.map_or(true, |q| b.quarter_year == q))
            .cloned()
            .collect())
    }

    async fn find_budget(&self, team: &str, quarter: &str) -> Result<Option<TeamBudget>> {
        let tables = self.tables.read().await;
        Ok(tables
            .budgets
            .values()
            .find(|b| b.team == team && b.quarter_year == quarter)
            .cloned())
    }

    async fn insert_budget(&self, mut budget: TeamBudget) -> Result<TeamBudget> {
        let mut tables = self.tables.write().await;
        budget.id = tables.next_id();
        tables.budgets.insert(budget.id, budget.clone());
        Ok(budget)
    }

    async fn update_budget(&self, budget: &TeamBudget) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.budgets.insert(budget.id, budget.clone());
        Ok(())
    }

    async fn insert_migration(&self, mut action: MigrationAction) -> Result<MigrationAction> {
        let mut tables = self.tables.write().await;
        action.id = tables.next_id();
        tables.migrations.push(action.clone());
        Ok(action)
    }

    async fn list_migrations(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<MigrationAction>, usize)> {
        let tables = self.tables.read().await;
        let mut rows = tables.migrations.clone();
        rows.sort_by(|a, b| {
            b.executed_at_utc
                .cmp(&a.executed_at_utc)
                .then(b.id.cmp(&a.id))
        });
        let total = rows.len();
        Ok((rows.into_iter().skip(offset).take(limit).collect(), total))
    }

    async fn list_jobs(&self) -> Result<Vec<ScheduledJob>> {
        Ok(self.tables.read().await.jobs.values().cloned().collect())
    }

    async fn get_job(&self, id: i64) -> Result<Option<ScheduledJob>> {
        Ok(self.tables.read().await.jobs.get(&id).cloned())
    }

    async fn insert_job(&self, mut job: ScheduledJob) -> Result<ScheduledJob> {
        let mut tables = self.tables.write().await;
        job.id = tables.next_id();
        tables.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update_job(&self, job: &ScheduledJob) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn list_settings(&self) -> Result<Vec<Setting>> {
        let tables = self.tables.read().await;
        Ok(tables
            .settings
            .iter()
            .map(|(key, value)| Setting {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        let tables = self.tables.read().await;
        Ok(tables.settings.get(key).map(|value| Setting {
            key: key.to_string(),
            value: value.clone(),
        }))
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<Setting> {
        let mut tables = self.tables.write().await;
        tables.settings.insert(key.to_string(), value.to_string());
        Ok(Setting {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    async fn insert_setting_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.settings.contains_key(key) {
            return Ok(false);
        }
        tables.settings.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}
