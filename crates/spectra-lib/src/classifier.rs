//! Risk classification and rightsizing recommendations

use rand::Rng;

use crate::catalog::{Catalog, Thresholds, HOURS_PER_MONTH};
use crate::error::{Result, SpectraError};
use crate::estimator::{round1, round2};
use crate::models::{Instance, Recommendation, RiskTier};

/// Risk tier for the given utilization percentages
pub fn classify_risk(thresholds: &Thresholds, cpu: f64, memory: f64) -> RiskTier {
    if cpu > thresholds.risk_high || memory > thresholds.risk_high {
        RiskTier::High
    } else if cpu > thresholds.risk_medium || memory > thresholds.risk_medium {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Whether utilization is low enough to consider a smaller type
pub fn is_underutilized(thresholds: &Thresholds, cpu: f64, memory: f64) -> bool {
    cpu < thresholds.rightsizing_cpu && memory < thresholds.rightsizing_memory
}

/// Rightsizing recommendation for an instance, if one applies
///
/// Emitted only when the type has a mapped smaller type and the instance is
/// underutilized. The confidence is drawn from `rng` so callers control
/// determinism.
pub fn recommend<R: Rng>(
    catalog: &Catalog,
    instance_type: &str,
    cpu: f64,
    memory: f64,
    co2e_per_month: f64,
    rng: &mut R,
) -> Option<Recommendation> {
    let thresholds = &catalog.thresholds;
    let target = catalog.rightsizing_target(instance_type)?;
    if !is_underutilized(thresholds, cpu, memory) {
        return None;
    }

    let target_cost = catalog
        .instance_type(target)
        .map(|t| t.cost_per_hour)
        .unwrap_or(0.0);
    let confidence = round1(rng.gen_range(thresholds.confidence_min..=thresholds.confidence_max));

    Some(Recommendation {
        target_type: target.to_string(),
        confidence,
        potential_savings: round2(co2e_per_month * thresholds.rightsizing_saving_ratio),
        cost_savings: round2(target_cost * thresholds.rightsizing_saving_ratio * HOURS_PER_MONTH),
    })
}

/// Re-derive risk and recommendation after utilization or emissions change
pub fn recompute<R: Rng>(catalog: &Catalog, instance: &mut Instance, rng: &mut R) {
    instance.risk = classify_risk(
        &catalog.thresholds,
        instance.cpu_utilization,
        instance.memory_utilization,
    );
    instance.recommendation = recommend(
        catalog,
        &instance.instance_type,
        instance.cpu_utilization,
        instance.memory_utilization,
        instance.co2e_per_month,
        rng,
    );
}

/// Result of applying a rightsizing recommendation in place
#[derive(Debug, Clone, PartialEq)]
pub struct Rightsized {
    pub previous_type: String,
    pub new_type: String,
    pub co2e_reduction: f64,
}

/// Apply the pending recommendation to an instance
///
/// Fails with a validation error when nothing is pending. The new hourly cost
/// comes from the catalog, or is half the current cost for an unknown type.
pub fn apply_rightsizing(catalog: &Catalog, instance: &mut Instance) -> Result<Rightsized> {
    let recommendation = instance.recommendation.take().ok_or_else(|| {
        SpectraError::validation("No recommendation available for this instance")
    })?;

    let new_type = recommendation.target_type;
    let new_cost = catalog
        .instance_type(&new_type)
        .map(|t| t.cost_per_hour)
        .unwrap_or(instance.cost_per_hour * 0.5);
    let new_co2e = round2(instance.co2e_per_month - recommendation.potential_savings).max(0.0);

    let rightsized = Rightsized {
        previous_type: std::mem::replace(&mut instance.instance_type, new_type.clone()),
        new_type,
        co2e_reduction: round2(instance.co2e_per_month - new_co2e),
    };
    instance.cost_per_hour = new_cost;
    instance.co2e_per_month = new_co2e;
    instance.risk = RiskTier::Low;

    Ok(rightsized)
}
