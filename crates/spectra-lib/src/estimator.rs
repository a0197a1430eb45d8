//! Carbon and cost estimation
//!
//! Converts an instance's power model and CPU utilization into monthly energy
//! and emissions. The grid intensity is always supplied by the caller so the
//! estimate itself never touches the clock or the store.

use serde::Serialize;

use crate::catalog::{Catalog, HOURS_PER_MONTH};

/// Where an intensity value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensitySource {
    /// Row recorded at exactly the current simulated hour
    Live,
    /// Static regional average
    Average,
}

/// Grid intensity applied to a region's estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionIntensity {
    pub region_code: String,
    /// gCO2e per kWh
    pub intensity: i32,
    pub source: IntensitySource,
}

impl RegionIntensity {
    pub fn live(region_code: impl Into<String>, intensity: i32) -> Self {
        Self {
            region_code: region_code.into(),
            intensity,
            source: IntensitySource::Live,
        }
    }

    pub fn average(catalog: &Catalog, region_code: &str) -> Self {
        Self {
            region_code: region_code.to_string(),
            intensity: catalog.average_intensity(region_code),
            source: IntensitySource::Average,
        }
    }
}

/// Round half away from zero to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round half away from zero to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Monthly energy in kWh for an instance type at a CPU utilization
pub fn monthly_kwh(catalog: &Catalog, instance_type: &str, cpu_percent: f64) -> f64 {
    let watts = catalog.power_model(instance_type).watts(cpu_percent);
    watts / 1000.0 * HOURS_PER_MONTH
}

/// Estimated monthly emissions in kg CO2e, rounded to 2 decimal places
///
/// Unknown instance types use the catalog's fallback power model.
pub fn estimate_monthly_co2e(
    catalog: &Catalog,
    instance_type: &str,
    intensity: &RegionIntensity,
    cpu_percent: f64,
) -> f64 {
    let kwh = monthly_kwh(catalog, instance_type, cpu_percent);
    round2(kwh * intensity.intensity as f64 / 1000.0)
}

/// Monthly on-demand cost in USD for an hourly price
pub fn monthly_cost(cost_per_hour: f64) -> f64 {
    round2(cost_per_hour * HOURS_PER_MONTH)
}
