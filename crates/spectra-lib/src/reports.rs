//! Dashboard metrics and emissions reports
//!
//! Scope 1 is always zero (no direct combustion). Scope 2 is the estimated
//! electricity emissions of running instances at each region's effective
//! intensity. Scope 3 is a fixed fraction of Scope 2.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::budgets::{BudgetService, BudgetTotals};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::estimator::{estimate_monthly_co2e, monthly_kwh, round2, RegionIntensity};
use crate::intensity::{enabled_regions, IntensityService};
use crate::models::{AnomalyAction, InstanceFilter};
use crate::store::SharedStore;

/// Instances listed in a report breakdown
pub const INSTANCE_BREAKDOWN_LIMIT: usize = 20;

/// Months covered by the emissions history
pub const HISTORY_MONTHS: i64 = 12;

/// Month-over-month emissions change shown on the dashboard, in percent
///
/// Fixed until prior-month totals are persisted.
pub const DASHBOARD_TREND_PCT: f64 = -12.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scopes {
    pub scope1: f64,
    pub scope2: f64,
    pub scope3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActions {
    pub pending_optimizations: usize,
    pub active_anomalies: usize,
    pub jobs_to_reschedule: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub sim_now_utc: DateTime<Utc>,
    pub co2e_today: f64,
    pub co2e_month: f64,
    pub co2e_year: f64,
    pub trend: f64,
    pub budget: BudgetTotals,
    pub scopes: Scopes,
    pub saved_this_month: f64,
    pub anomalies_detected: usize,
    pub instances_optimized: usize,
    pub quick_actions: QuickActions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionBreakdown {
    pub region_code: String,
    pub display_name: String,
    pub carbon_intensity: i32,
    pub instance_count: usize,
    #[serde(rename = "scope2_kg")]
    pub scope2_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceBreakdown {
    pub id: i64,
    pub name: String,
    pub team: String,
    pub region_code: String,
    pub instance_type: String,
    pub co2e_per_month: f64,
    #[serde(rename = "scope2_kg")]
    pub scope2_kg: f64,
}

/// Which scopes a report includes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScopeSelection {
    #[serde(default = "yes")]
    pub scope1: bool,
    #[serde(default = "yes")]
    pub scope2: bool,
    #[serde(default = "yes")]
    pub scope3: bool,
}

fn yes() -> bool {
    true
}

impl Default for ScopeSelection {
    fn default() -> Self {
        Self {
            scope1: true,
            scope2: true,
            scope3: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub period: String,
    pub generated_at: DateTime<Utc>,
    pub total_emissions: f64,
    pub scope1: Option<f64>,
    pub scope2: Option<f64>,
    pub scope3: Option<f64>,
    pub region_breakdown: Vec<RegionBreakdown>,
    pub instance_breakdown: Vec<InstanceBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEmissions {
    /// e.g. `Jan 2024`
    pub month: String,
    /// e.g. `2024-01`
    pub month_iso: String,
    pub co2e: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportExport {
    pub summary: ReportSummary,
    pub history: Vec<MonthlyEmissions>,
}

/// Per-region Scope 2 with the instances behind it
struct Scope2 {
    total: f64,
    regions: Vec<RegionBreakdown>,
    instances: Vec<InstanceBreakdown>,
}

#[derive(Clone)]
pub struct ReportService {
    store: SharedStore,
    catalog: Arc<Catalog>,
    intensity: IntensityService,
    budgets: BudgetService,
}

impl ReportService {
    pub fn new(store: SharedStore, catalog: Arc<Catalog>) -> Self {
        Self {
            intensity: IntensityService::new(store.clone(), catalog.clone()),
            budgets: BudgetService::new(store.clone()),
            store,
            catalog,
        }
    }

    fn scopes(&self, scope2: f64) -> Scopes {
        Scopes {
            scope1: 0.0,
            scope2: round2(scope2),
            scope3: round2(round2(scope2) * self.catalog.thresholds.scope3_ratio),
        }
    }

    async fn scope2(&self, sim_now: DateTime<Utc>) -> Result<Scope2> {
        let running = self.store.list_instances(&InstanceFilter::running()).await?;
        let mut total = 0.0;
        let mut regions = Vec::new();
        let mut instances = Vec::new();

        for region in enabled_regions(&self.store, &self.catalog).await? {
            let intensity: RegionIntensity = self.intensity.effective(&region.code, sim_now).await?;
            let mut region_total = 0.0;
            let mut count = 0;

            for instance in running.iter().filter(|i| i.region_code == region.code) {
                // Unrounded; the region total is rounded once
                let kg = monthly_kwh(
                    &self.catalog,
                    &instance.instance_type,
                    instance.cpu_utilization,
                ) * intensity.intensity as f64
                    / 1000.0;
                region_total += kg;
                count += 1;
                instances.push(InstanceBreakdown {
                    id: instance.id,
                    name: instance.name.clone(),
                    team: instance.team.clone(),
                    region_code: instance.region_code.clone(),
                    instance_type: instance.instance_type.clone(),
                    co2e_per_month: instance.co2e_per_month,
                    scope2_kg: estimate_monthly_co2e(
                        &self.catalog,
                        &instance.instance_type,
                        &intensity,
                        instance.cpu_utilization,
                    ),
                });
            }

            total += region_total;
            if count > 0 {
                regions.push(RegionBreakdown {
                    region_code: region.code,
                    display_name: region.display_name,
                    carbon_intensity: intensity.intensity,
                    instance_count: count,
                    scope2_kg: round2(region_total),
                });
            }
        }

        Ok(Scope2 {
            total: round2(total),
            regions,
            instances,
        })
    }

    pub async fn dashboard(&self, sim_now: DateTime<Utc>) -> Result<DashboardMetrics> {
        let running = self.store.list_instances(&InstanceFilter::running()).await?;
        let co2e_month = round2(running.iter().map(|i| i.co2e_per_month).sum());
        let pending_optimizations = running
            .iter()
            .filter(|i| i.recommendation.is_some())
            .count();

        let scope2 = self.scope2(sim_now).await?;
        let anomalies = self.store.list_anomalies().await?;
        let jobs_to_reschedule = self
            .store
            .list_jobs()
            .await?
            .iter()
            .filter(|j| j.needs_rescheduling())
            .count();

        Ok(DashboardMetrics {
            sim_now_utc: sim_now,
            co2e_today: round2(co2e_month / 30.0),
            co2e_month,
            co2e_year: round2(co2e_month * 12.0),
            trend: DASHBOARD_TREND_PCT,
            budget: self.budgets.totals().await?,
            scopes: self.scopes(scope2.total),
            saved_this_month: round2(anomalies.iter().map(|a| a.co2e_saved).sum()),
            anomalies_detected: anomalies.len(),
            instances_optimized: pending_optimizations,
            quick_actions: QuickActions {
                pending_optimizations,
                active_anomalies: anomalies
                    .iter()
                    .filter(|a| a.action == AnomalyAction::Pending)
                    .count(),
                jobs_to_reschedule,
            },
        })
    }

    /// Scope summary with region and top-instance breakdowns
    pub async fn summary(
        &self,
        period: &str,
        selection: ScopeSelection,
        sim_now: DateTime<Utc>,
    ) -> Result<ReportSummary> {
        let mut scope2 = self.scope2(sim_now).await?;
        let scopes = self.scopes(scope2.total);

        let pick = |on: bool, value: f64| on.then_some(value);
        let total_emissions = round2(
            pick(selection.scope1, scopes.scope1).unwrap_or(0.0)
                + pick(selection.scope2, scopes.scope2).unwrap_or(0.0)
                + pick(selection.scope3, scopes.scope3).unwrap_or(0.0),
        );

        scope2
            .instances
            .sort_by(|a, b| b.scope2_kg.total_cmp(&a.scope2_kg).then(a.id.cmp(&b.id)));
        scope2.instances.truncate(INSTANCE_BREAKDOWN_LIMIT);

        Ok(ReportSummary {
            period: period.to_string(),
            generated_at: Utc::now(),
            total_emissions,
            scope1: pick(selection.scope1, scopes.scope1),
            scope2: pick(selection.scope2, scopes.scope2),
            scope3: pick(selection.scope3, scopes.scope3),
            region_breakdown: scope2.regions,
            instance_breakdown: scope2.instances,
        })
    }

    /// Twelve monthly totals ending at `sim_now`, oldest first
    ///
    /// Derived from the current monthly total with a 1% per month upward
    /// trend towards the present.
    pub async fn history(&self, sim_now: DateTime<Utc>) -> Result<Vec<MonthlyEmissions>> {
        let running = self.store.list_instances(&InstanceFilter::running()).await?;
        let monthly = round2(running.iter().map(|i| i.co2e_per_month).sum());

        Ok((0..HISTORY_MONTHS)
            .rev()
            .map(|months_back| {
                let at = sim_now - Duration::days(30 * months_back);
                let variation = 1.0 - months_back as f64 * 0.01;
                MonthlyEmissions {
                    month: at.format("%b %Y").to_string(),
                    month_iso: at.format("%Y-%m").to_string(),
                    co2e: round2(monthly * variation),
                }
            })
            .collect())
    }

    pub async fn export(&self, period: &str, sim_now: DateTime<Utc>) -> Result<ReportExport> {
        Ok(ReportExport {
            summary: self
                .summary(period, ScopeSelection::default(), sim_now)
                .await?,
            history: self.history(sim_now).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intensity::tests::{put, seed_regions, t0};
    use crate::models::{Instance, InstanceStatus, RiskTier};
    use crate::store::MemoryStore;

    async fn fixture() -> (ReportService, SharedStore) {
        let store = MemoryStore::shared();
        let catalog = Arc::new(Catalog::builtin());
        seed_regions(&store, &catalog).await;
        (ReportService::new(store.clone(), catalog), store)
    }

    async fn add(store: &SharedStore, region: &str, cpu: f64, co2e: f64, status: InstanceStatus) {
        store
            .insert_instance(Instance {
                id: 0,
                name: format!("frontend-web-{region}"),
                region_code: region.into(),
                instance_type: "m5.large".into(),
                cost_per_hour: 0.096,
                team: "Frontend".into(),
                status,
                cpu_utilization: cpu,
                memory_utilization: 10.0,
                co2e_per_month: co2e,
                recommendation: None,
                risk: RiskTier::Low,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scopes_follow_effective_intensity() {
        let (reports, store) = fixture().await;
        put(&store, "SE", t0(), 100).await;
        // 60 W -> 43.2 kWh; SE live 100 g -> 4.32 kg, JP average 500 g -> 21.6 kg
        add(&store, "SE", 50.0, 4.0, InstanceStatus::Running).await;
        add(&store, "JP", 50.0, 20.0, InstanceStatus::Running).await;
        add(&store, "JP", 50.0, 20.0, InstanceStatus::Stopped).await;

        let metrics = reports.dashboard(t0()).await.unwrap();
        assert_eq!(metrics.scopes.scope1, 0.0);
        assert_eq!(metrics.scopes.scope2, 25.92);
        assert_eq!(metrics.scopes.scope3, 5.18);
        assert_eq!(metrics.co2e_month, 24.0);
        assert_eq!(metrics.co2e_today, 0.8);
        assert_eq!(metrics.co2e_year, 288.0);
        assert_eq!(metrics.trend, DASHBOARD_TREND_PCT);
    }

    #[tokio::test]
    async fn test_summary_scope_toggles() {
        let (reports, store) = fixture().await;
        add(&store, "US", 50.0, 16.0, InstanceStatus::Running).await;

        let selection = ScopeSelection {
            scope1: true,
            scope2: true,
            scope3: false,
        };
        let summary = reports.summary("Q1-2024", selection, t0()).await.unwrap();
        // US average 380 g: 43.2 kWh -> 16.416 kg
        assert_eq!(summary.scope2, Some(16.42));
        assert_eq!(summary.scope3, None);
        assert_eq!(summary.total_emissions, 16.42);
        assert_eq!(summary.region_breakdown.len(), 1);
        assert_eq!(summary.instance_breakdown.len(), 1);
    }

    #[tokio::test]
    async fn test_instance_breakdown_is_capped() {
        let (reports, store) = fixture().await;
        for i in 0..25 {
            add(&store, "IE", i as f64, 1.0, InstanceStatus::Running).await;
        }
        let summary = reports
            .summary("current", ScopeSelection::default(), t0())
            .await
            .unwrap();
        assert_eq!(summary.instance_breakdown.len(), INSTANCE_BREAKDOWN_LIMIT);
        assert!(summary.instance_breakdown[0].scope2_kg >= summary.instance_breakdown[19].scope2_kg);
    }

    #[tokio::test]
    async fn test_history_trends_towards_now() {
        let (reports, store) = fixture().await;
        add(&store, "IE", 50.0, 100.0, InstanceStatus::Running).await;

        let history = reports.history(t0()).await.unwrap();
        assert_eq!(history.len(), 12);
        assert_eq!(history[11].co2e, 100.0);
        assert_eq!(history[11].month_iso, "2024-01");
        assert_eq!(history[0].co2e, 89.0);
    }
}
