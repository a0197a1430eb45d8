//! Instance listing, patching and in-place rightsizing

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::catalog::Catalog;
use crate::classifier::{apply_rightsizing, recompute};
use crate::clock::SimClock;
use crate::error::{Result, SpectraError};
use crate::estimator::estimate_monthly_co2e;
use crate::intensity::IntensityService;
use crate::models::{Instance, InstanceFilter, InstanceStatus, MigrationAction};
use crate::observability::{EventLogger, SpectraMetrics};
use crate::store::SharedStore;

/// Mutable instance fields; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePatch {
    pub team: Option<String>,
    pub status: Option<InstanceStatus>,
    pub region_code: Option<String>,
    pub cpu_utilization: Option<f64>,
    pub memory_utilization: Option<f64>,
}

impl InstancePatch {
    pub fn is_empty(&self) -> bool {
        self.team.is_none()
            && self.status.is_none()
            && self.region_code.is_none()
            && self.cpu_utilization.is_none()
            && self.memory_utilization.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeResult {
    pub optimized: bool,
    pub instance: Instance,
}

fn check_percent(field: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(SpectraError::validation(format!(
            "{field} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct InstanceService {
    store: SharedStore,
    catalog: Arc<Catalog>,
    clock: SimClock,
    intensity: IntensityService,
    rng: Arc<Mutex<StdRng>>,
    metrics: SpectraMetrics,
    logger: EventLogger,
}

impl InstanceService {
    pub fn new(
        store: SharedStore,
        catalog: Arc<Catalog>,
        clock: SimClock,
        logger: EventLogger,
    ) -> Self {
        let intensity = IntensityService::new(store.clone(), catalog.clone());
        Self {
            store,
            catalog,
            clock,
            intensity,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            metrics: SpectraMetrics::new(),
            logger,
        }
    }

    /// Use a fixed seed for recommendation confidence
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub async fn list(&self, filter: &InstanceFilter) -> Result<Vec<Instance>> {
        self.store.list_instances(filter).await
    }

    async fn get(&self, id: i64) -> Result<Instance> {
        self.store
            .get_instance(id)
            .await?
            .ok_or_else(|| SpectraError::not_found("Instance not found"))
    }

    /// Apply a patch; emissions, risk and recommendation follow utilization
    pub async fn patch(&self, id: i64, patch: InstancePatch) -> Result<Instance> {
        if patch.is_empty() {
            return Err(SpectraError::validation("No fields to update"));
        }
        let mut instance = self.get(id).await?;

        if let Some(code) = &patch.region_code {
            let known = self
                .store
                .list_regions()
                .await?
                .iter()
                .any(|r| &r.code == code);
            if !known {
                return Err(SpectraError::validation(format!("Unknown region '{code}'")));
            }
        }
        if let Some(cpu) = patch.cpu_utilization {
            check_percent("cpuUtilization", cpu)?;
        }
        if let Some(mem) = patch.memory_utilization {
            check_percent("memoryUtilization", mem)?;
        }

        let reestimate = patch.cpu_utilization.is_some() || patch.region_code.is_some();
        let reclassify = reestimate || patch.memory_utilization.is_some();

        if let Some(team) = patch.team {
            instance.team = team;
        }
        if let Some(status) = patch.status {
            instance.status = status;
        }
        if let Some(code) = patch.region_code {
            instance.region_code = code;
        }
        if let Some(cpu) = patch.cpu_utilization {
            instance.cpu_utilization = cpu;
        }
        if let Some(mem) = patch.memory_utilization {
            instance.memory_utilization = mem;
        }

        if reestimate {
            let sim_now = self.clock.now().await?;
            let intensity = self
                .intensity
                .effective(&instance.region_code, sim_now)
                .await?;
            instance.co2e_per_month = estimate_monthly_co2e(
                &self.catalog,
                &instance.instance_type,
                &intensity,
                instance.cpu_utilization,
            );
        }
        if reclassify {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            recompute(&self.catalog, &mut instance, &mut *rng);
        }

        self.store.update_instance(&instance).await?;
        Ok(instance)
    }

    /// Apply the pending rightsizing recommendation and audit it in place
    pub async fn optimize(&self, id: i64) -> Result<OptimizeResult> {
        let mut instance = self.get(id).await?;
        let rightsized = apply_rightsizing(&self.catalog, &mut instance)?;
        self.store.update_instance(&instance).await?;

        self.store
            .insert_migration(MigrationAction {
                id: 0,
                from_region: instance.region_code.clone(),
                to_region: instance.region_code.clone(),
                moved_count: 1,
                executed_at_utc: Utc::now(),
            })
            .await?;

        self.metrics.inc_rightsizing_applied();
        self.logger.log_rightsizing(
            instance.id,
            &rightsized.previous_type,
            &rightsized.new_type,
            rightsized.co2e_reduction,
        );

        Ok(OptimizeResult {
            optimized: true,
            instance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{parse_start, DEFAULT_SIM_START};
    use crate::intensity::tests::{put, seed_regions, t0};
    use crate::models::RiskTier;
    use crate::store::MemoryStore;

    async fn service() -> (InstanceService, SharedStore) {
        let store = MemoryStore::shared();
        let catalog = Arc::new(Catalog::builtin());
        seed_regions(&store, &catalog).await;
        let clock = SimClock::new(store.clone(), parse_start(DEFAULT_SIM_START).unwrap());
        let service = InstanceService::new(store.clone(), catalog, clock, EventLogger::default())
            .with_seed(11);
        (service, store)
    }

    async fn insert(store: &SharedStore, cpu: f64, mem: f64) -> Instance {
        store
            .insert_instance(Instance {
                id: 0,
                name: "ml-training-gpu-001".into(),
                region_code: "IE".into(),
                instance_type: "m5.large".into(),
                cost_per_hour: 0.096,
                team: "ML-Training".into(),
                status: InstanceStatus::Running,
                cpu_utilization: cpu,
                memory_utilization: mem,
                co2e_per_month: 10.0,
                recommendation: None,
                risk: RiskTier::High,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let (service, store) = service().await;
        let inst = insert(&store, 80.0, 80.0).await;
        let err = service
            .patch(inst.id, InstancePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SpectraError::Validation(_)));
    }

    #[tokio::test]
    async fn test_patch_unknown_instance() {
        let (service, _) = service().await;
        let patch = InstancePatch {
            team: Some("Ops".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.patch(404, patch).await,
            Err(SpectraError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_utilization_patch_recomputes_classification() {
        let (service, store) = service().await;
        put(&store, "IE", t0(), 300).await;
        let inst = insert(&store, 80.0, 80.0).await;

        let patched = service
            .patch(
                inst.id,
                InstancePatch {
                    cpu_utilization: Some(10.0),
                    memory_utilization: Some(20.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(patched.risk, RiskTier::Low);
        // 50 + 10 * 0.1 * 2 = 52 W -> 37.44 kWh at 300 g/kWh
        assert_eq!(patched.co2e_per_month, 11.23);
        let rec = patched.recommendation.unwrap();
        assert_eq!(rec.target_type, "t3.medium");
        assert_eq!(rec.potential_savings, 5.05);
    }

    #[tokio::test]
    async fn test_optimize_writes_in_place_audit() {
        let (service, store) = service().await;
        let inst = insert(&store, 80.0, 80.0).await;
        service
            .patch(
                inst.id,
                InstancePatch {
                    cpu_utilization: Some(5.0),
                    memory_utilization: Some(5.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = service.optimize(inst.id).await.unwrap();
        assert!(result.optimized);
        assert_eq!(result.instance.instance_type, "t3.medium");
        assert!(result.instance.recommendation.is_none());

        let (audit, total) = store.list_migrations(20, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(audit[0].from_region, "IE");
        assert_eq!(audit[0].to_region, "IE");
        assert_eq!(audit[0].moved_count, 1);

        // Nothing pending any more
        assert!(matches!(
            service.optimize(inst.id).await,
            Err(SpectraError::Validation(_))
        ));
    }
}
