//! Carbon-intensity queries keyed on the simulated clock
//!
//! Every query takes `sim_now` explicitly; nothing here reads the clock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::clock::sub_hours;
use crate::error::{Result, SpectraError};
use crate::estimator::RegionIntensity;
use crate::models::{CarbonIntensityHour, Region};
use crate::store::SharedStore;

/// Rows returned by a forecast
pub const FORECAST_HOURS: usize = 24;

/// Default history window
pub const DEFAULT_HISTORY_HOURS: i64 = 168;

/// One hour of the forward-looking forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastHour {
    pub hour: usize,
    pub timestamp_utc: DateTime<Utc>,
    pub region_code: String,
    pub intensity: i32,
    pub is_optimal: bool,
    pub is_peak: bool,
}

/// Live signal of one region at the simulated hour
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSignal {
    pub code: String,
    pub display_name: String,
    pub carbon_intensity: Option<i32>,
    pub timestamp_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestSignals {
    pub sim_now_utc: DateTime<Utc>,
    pub regions: Vec<RegionSignal>,
}

/// Enabled regions ordered as the catalog lists them
///
/// Regions unknown to the catalog keep their store order after the known ones.
pub async fn enabled_regions(store: &SharedStore, catalog: &Catalog) -> Result<Vec<Region>> {
    let mut regions: Vec<Region> = store
        .list_regions()
        .await?
        .into_iter()
        .filter(|r| r.enabled)
        .collect();
    let position = |code: &str| {
        catalog
            .regions()
            .iter()
            .position(|r| r.code == code)
            .unwrap_or(usize::MAX)
    };
    regions.sort_by_key(|r| position(&r.code));
    Ok(regions)
}

/// Query service over the intensity time series
#[derive(Clone)]
pub struct IntensityService {
    store: SharedStore,
    catalog: Arc<Catalog>,
}

impl IntensityService {
    pub fn new(store: SharedStore, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }

    /// Intensity recorded at exactly `sim_now`
    pub async fn live(&self, region: &str, sim_now: DateTime<Utc>) -> Result<Option<i32>> {
        Ok(self
            .store
            .intensity_at(region, sim_now)
            .await?
            .map(|row| row.carbon_intensity))
    }

    /// Live intensity, or the region's static average when no row exists
    pub async fn effective(&self, region: &str, sim_now: DateTime<Utc>) -> Result<RegionIntensity> {
        Ok(match self.live(region, sim_now).await? {
            Some(value) => RegionIntensity::live(region, value),
            None => RegionIntensity::average(&self.catalog, region),
        })
    }

    /// Enabled region with the lowest live intensity; first in catalog order wins ties
    pub async fn greenest_region(&self, sim_now: DateTime<Utc>) -> Result<Option<String>> {
        let mut best: Option<(String, i32)> = None;
        for region in enabled_regions(&self.store, &self.catalog).await? {
            if let Some(value) = self.live(&region.code, sim_now).await? {
                if best.as_ref().map_or(true, |(_, b)| value < *b) {
                    best = Some((region.code, value));
                }
            }
        }
        Ok(best.map(|(code, _)| code))
    }

    /// Next 24 hours of intensity at or after `sim_now`, flagged optimal / peak
    ///
    /// Without a region the greenest region at `sim_now` is used; the result
    /// is empty when no region has a live row.
    pub async fn forecast(
        &self,
        region: Option<&str>,
        sim_now: DateTime<Utc>,
    ) -> Result<Vec<ForecastHour>> {
        let region = match region {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => match self.greenest_region(sim_now).await? {
                Some(code) => code,
                None => return Ok(Vec::new()),
            },
        };

        let thresholds = &self.catalog.thresholds;
        let rows = self
            .store
            .intensity_from(&region, sim_now, FORECAST_HOURS)
            .await?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(hour, row)| ForecastHour {
                hour,
                timestamp_utc: row.timestamp_utc,
                is_optimal: row.carbon_intensity < thresholds.forecast_optimal,
                is_peak: row.carbon_intensity > thresholds.forecast_peak,
                intensity: row.carbon_intensity,
                region_code: row.region_code,
            })
            .collect())
    }

    /// Rows in `[sim_now - hours, sim_now]`, ascending
    pub async fn history(
        &self,
        region: &str,
        hours: i64,
        sim_now: DateTime<Utc>,
    ) -> Result<Vec<CarbonIntensityHour>> {
        if hours < 1 {
            return Err(SpectraError::validation("hours must be at least 1"));
        }
        self.store
            .intensity_between(region, sub_hours(sim_now, hours)?, sim_now)
            .await
    }

    /// Live intensity of every enabled region at `sim_now`
    pub async fn latest_signals(&self, sim_now: DateTime<Utc>) -> Result<LatestSignals> {
        let mut regions = Vec::new();
        for region in enabled_regions(&self.store, &self.catalog).await? {
            let row = self.store.intensity_at(&region.code, sim_now).await?;
            regions.push(RegionSignal {
                carbon_intensity: row.as_ref().map(|r| r.carbon_intensity),
                timestamp_utc: row.map_or(sim_now, |r| r.timestamp_utc),
                code: region.code,
                display_name: region.display_name,
            });
        }
        Ok(LatestSignals {
            sim_now_utc: sim_now,
            regions,
        })
    }
}
