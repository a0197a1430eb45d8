//! Carbon-aware job scheduling
//!
//! Jobs carry a recommended schedule chosen against the intensity forecast.
//! The flexibility tier only decides whether a job counts as needing a
//! reschedule; it does not gate acceptance.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, SpectraError};
use crate::intensity::{ForecastHour, IntensityService};
use crate::models::{Flexibility, ScheduledJob};
use crate::store::SharedStore;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub name: String,
    pub team: String,
    pub current_schedule: String,
    pub recommended_schedule: String,
    pub duration_hours: f64,
    pub carbon_savings: f64,
    pub flexibility: Flexibility,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub current_schedule: Option<String>,
    pub recommended_schedule: Option<String>,
    pub flexibility: Option<Flexibility>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.current_schedule.is_none()
            && self.recommended_schedule.is_none()
            && self.flexibility.is_none()
    }
}

#[derive(Clone)]
pub struct JobScheduler {
    store: SharedStore,
    intensity: IntensityService,
}

impl JobScheduler {
    pub fn new(store: SharedStore, intensity: IntensityService) -> Self {
        Self { store, intensity }
    }

    /// All jobs, largest carbon savings first
    pub async fn list(&self) -> Result<Vec<ScheduledJob>> {
        let mut jobs = self.store.list_jobs().await?;
        jobs.sort_by(|a, b| b.carbon_savings.total_cmp(&a.carbon_savings));
        Ok(jobs)
    }

    pub async fn create(&self, new: NewJob) -> Result<ScheduledJob> {
        if new.name.trim().is_empty() {
            return Err(SpectraError::validation("name is required"));
        }
        if new.duration_hours < 0.0 {
            return Err(SpectraError::validation("durationHours must not be negative"));
        }

        self.store
            .insert_job(ScheduledJob {
                id: 0,
                name: new.name,
                team: new.team,
                current_schedule: new.current_schedule,
                recommended_schedule: new.recommended_schedule,
                duration_hours: new.duration_hours,
                carbon_savings: new.carbon_savings,
                flexibility: new.flexibility,
                accepted: false,
            })
            .await
    }

    async fn get(&self, id: i64) -> Result<ScheduledJob> {
        self.store
            .get_job(id)
            .await?
            .ok_or_else(|| SpectraError::not_found("Job not found"))
    }

    pub async fn patch(&self, id: i64, patch: JobPatch) -> Result<ScheduledJob> {
        if patch.is_empty() {
            return Err(SpectraError::validation("No fields to update"));
        }
        let mut job = self.get(id).await?;
        if let Some(schedule) = patch.current_schedule {
            job.current_schedule = schedule;
        }
        if let Some(schedule) = patch.recommended_schedule {
            job.recommended_schedule = schedule;
        }
        if let Some(flexibility) = patch.flexibility {
            job.flexibility = flexibility;
        }
        self.store.update_job(&job).await?;
        Ok(job)
    }

    /// Adopt the recommended schedule; repeating the call changes nothing
    pub async fn accept_recommendation(&self, id: i64) -> Result<ScheduledJob> {
        let mut job = self.get(id).await?;
        job.accept_recommendation();
        self.store.update_job(&job).await?;
        Ok(job)
    }

    /// Jobs not yet accepted whose tier allows moving them
    pub async fn needs_rescheduling_count(&self) -> Result<usize> {
        Ok(self
            .store
            .list_jobs()
            .await?
            .iter()
            .filter(|j| j.needs_rescheduling())
            .count())
    }

    pub async fn forecast(
        &self,
        region: Option<&str>,
        sim_now: DateTime<Utc>,
    ) -> Result<Vec<ForecastHour>> {
        self.intensity.forecast(region, sim_now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn scheduler() -> JobScheduler {
        let store = MemoryStore::shared();
        let intensity = IntensityService::new(store.clone(), Arc::new(Catalog::builtin()));
        JobScheduler::new(store, intensity)
    }

    fn job(name: &str, savings: f64, flexibility: Flexibility) -> NewJob {
        NewJob {
            name: name.into(),
            team: "DataScience".into(),
            current_schedule: "Daily 09:00 UTC".into(),
            recommended_schedule: "Daily 02:00 UTC".into(),
            duration_hours: 3.0,
            carbon_savings: savings,
            flexibility,
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_savings() {
        let scheduler = scheduler();
        scheduler.create(job("a", 5.0, Flexibility::Batch)).await.unwrap();
        scheduler.create(job("b", 50.0, Flexibility::Batch)).await.unwrap();
        scheduler.create(job("c", 20.0, Flexibility::Batch)).await.unwrap();

        let names: Vec<_> = scheduler
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.name)
            .collect();
        assert_eq!(names, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_accept_is_idempotent() {
        let scheduler = scheduler();
        let created = scheduler
            .create(job("nightly-etl", 10.0, Flexibility::Flexible))
            .await
            .unwrap();

        let first = scheduler.accept_recommendation(created.id).await.unwrap();
        let second = scheduler.accept_recommendation(created.id).await.unwrap();
        assert_eq!(first, second);
        assert!(second.accepted);
        assert_eq!(second.current_schedule, "Daily 02:00 UTC");
    }

    #[tokio::test]
    async fn test_critical_jobs_can_be_accepted() {
        let scheduler = scheduler();
        let created = scheduler
            .create(job("payments", 1.0, Flexibility::Critical))
            .await
            .unwrap();
        assert_eq!(scheduler.needs_rescheduling_count().await.unwrap(), 0);
        assert!(scheduler.accept_recommendation(created.id).await.unwrap().accepted);
    }

    #[tokio::test]
    async fn test_needs_rescheduling_count() {
        let scheduler = scheduler();
        scheduler.create(job("a", 1.0, Flexibility::Batch)).await.unwrap();
        let b = scheduler.create(job("b", 1.0, Flexibility::Flexible)).await.unwrap();
        scheduler.create(job("c", 1.0, Flexibility::Critical)).await.unwrap();
        scheduler.accept_recommendation(b.id).await.unwrap();
        assert_eq!(scheduler.needs_rescheduling_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_patch_validation() {
        let scheduler = scheduler();
        let created = scheduler.create(job("a", 1.0, Flexibility::Batch)).await.unwrap();
        assert!(matches!(
            scheduler.patch(created.id, JobPatch::default()).await,
            Err(SpectraError::Validation(_))
        ));
        assert!(matches!(
            scheduler
                .patch(
                    999,
                    JobPatch {
                        flexibility: Some(Flexibility::Critical),
                        ..Default::default()
                    }
                )
                .await,
            Err(SpectraError::NotFound(_))
        ));

        let patched = scheduler
            .patch(
                created.id,
                JobPatch {
                    recommended_schedule: Some("Daily 23:00 UTC".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.recommended_schedule, "Daily 23:00 UTC");
        assert_eq!(patched.current_schedule, "Daily 09:00 UTC");
    }
}
