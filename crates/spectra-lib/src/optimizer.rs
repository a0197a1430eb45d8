//! Region ranking and bulk migration
//!
//! Ranking is a pure function over per-region statistics; the planner gathers
//! those statistics from the store and executes migrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::{Result, SpectraError};
use crate::intensity::enabled_regions;
use crate::models::{InstanceFilter, MigrationAction};
use crate::observability::{EventLogger, SpectraMetrics};
use crate::store::SharedStore;

/// Observed state of one region at the simulated hour
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStats {
    /// Display name
    pub region: String,
    pub region_code: String,
    pub carbon_intensity: i32,
    pub latency: f64,
    /// Average hourly cost of running instances
    pub cost_per_hour: f64,
    pub workloads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RegionRecommendation {
    Optimal,
    #[serde(rename_all = "camelCase")]
    Migrate { target: String, target_code: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRegion {
    #[serde(flatten)]
    pub stats: RegionStats,
    pub recommendation: RegionRecommendation,
}

/// Annotate regions with an OPTIMAL / MIGRATE recommendation
///
/// The region with the lowest intensity is optimal; on ties the first in
/// input order wins. Input order is preserved in the output.
pub fn rank_regions(stats: Vec<RegionStats>) -> Vec<RankedRegion> {
    let Some(greenest) = stats
        .iter()
        .enumerate()
        .min_by_key(|(index, s)| (s.carbon_intensity, *index))
        .map(|(_, s)| (s.region.clone(), s.region_code.clone()))
    else {
        return Vec::new();
    };

    stats
        .into_iter()
        .map(|stats| {
            let recommendation = if stats.region_code == greenest.1 {
                RegionRecommendation::Optimal
            } else {
                RegionRecommendation::Migrate {
                    target: greenest.0.clone(),
                    target_code: greenest.1.clone(),
                }
            };
            RankedRegion {
                stats,
                recommendation,
            }
        })
        .collect()
}

/// Which instances a migration moves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationMode {
    #[default]
    AllRunning,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRequest {
    pub from_region: String,
    pub to_region: String,
    #[serde(default)]
    pub mode: MigrationMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub moved: u32,
    pub from_region: String,
    pub to_region: String,
    pub executed_at_utc: DateTime<Utc>,
    /// Whether an audit entry was written
    pub audited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationHistory {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub records: Vec<MigrationAction>,
}

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Gathers region statistics and executes migrations
#[derive(Clone)]
pub struct MigrationPlanner {
    store: SharedStore,
    catalog: Arc<Catalog>,
    metrics: SpectraMetrics,
    logger: EventLogger,
}

impl MigrationPlanner {
    pub fn new(store: SharedStore, catalog: Arc<Catalog>, logger: EventLogger) -> Self {
        Self {
            store,
            catalog,
            metrics: SpectraMetrics::new(),
            logger,
        }
    }

    /// Statistics for every enabled region at `sim_now`, in catalog order
    pub async fn region_stats(&self, sim_now: DateTime<Utc>) -> Result<Vec<RegionStats>> {
        let missing = self.catalog.thresholds.ranking_missing_intensity;
        let mut out = Vec::new();

        for region in enabled_regions(&self.store, &self.catalog).await? {
            let carbon_intensity = self
                .store
                .intensity_at(&region.code, sim_now)
                .await?
                .map_or(missing, |row| row.carbon_intensity);
            let latency = self
                .store
                .latest_latency(&region.code)
                .await?
                .map_or(0.0, |m| m.latency_ms);

            let filter = InstanceFilter {
                region: Some(region.code.clone()),
                ..InstanceFilter::running()
            };
            let running = self.store.list_instances(&filter).await?;
            let workloads = running.len();
            let cost_per_hour = if workloads > 0 {
                running.iter().map(|i| i.cost_per_hour).sum::<f64>() / workloads as f64
            } else {
                0.0
            };

            out.push(RegionStats {
                region: region.display_name,
                region_code: region.code,
                carbon_intensity,
                latency,
                cost_per_hour,
                workloads,
            });
        }

        Ok(out)
    }

    pub async fn rank(&self, sim_now: DateTime<Utc>) -> Result<Vec<RankedRegion>> {
        Ok(rank_regions(self.region_stats(sim_now).await?))
    }

    /// Move every running instance from one region to another
    ///
    /// Both regions must exist and differ. A migration that moves nothing
    /// writes no audit entry.
    pub async fn execute(&self, request: &MigrationRequest) -> Result<MigrationResult> {
        let regions = self.store.list_regions().await?;
        let exists = |code: &str| regions.iter().any(|r| r.code == code);
        if !exists(&request.from_region) || !exists(&request.to_region) {
            return Err(SpectraError::validation("Invalid source or target region"));
        }
        if request.from_region == request.to_region {
            return Err(SpectraError::validation(
                "Source and target regions must be different",
            ));
        }

        let moved = match request.mode {
            MigrationMode::AllRunning => {
                self.store
                    .reassign_running(&request.from_region, &request.to_region)
                    .await?
            }
        };

        let executed_at_utc = Utc::now();
        let audited = moved > 0;
        if audited {
            self.store
                .insert_migration(MigrationAction {
                    id: 0,
                    from_region: request.from_region.clone(),
                    to_region: request.to_region.clone(),
                    moved_count: moved,
                    executed_at_utc,
                })
                .await?;
        }

        self.metrics.record_migration(moved);
        self.logger
            .log_migration(&request.from_region, &request.to_region, moved, audited);

        Ok(MigrationResult {
            moved,
            from_region: request.from_region.clone(),
            to_region: request.to_region.clone(),
            executed_at_utc,
            audited,
        })
    }

    /// Audit entries, newest first
    pub async fn history(&self, limit: usize, offset: usize) -> Result<MigrationHistory> {
        let (records, total) = self.store.list_migrations(limit, offset).await?;
        Ok(MigrationHistory {
            total,
            limit,
            offset,
            records,
        })
    }
}
