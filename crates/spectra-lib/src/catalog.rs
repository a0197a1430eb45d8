//! Static domain catalog
//!
//! Regions, instance types, power models, rightsizing targets and the
//! thresholds that drive classification. The catalog is built once at startup
//! and shared read-only; every lookup returns an explicit fallback instead of
//! leaving defaults to the call site.

use std::collections::HashMap;

/// Hours in the fixed billing month used by every monthly estimate
pub const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Intensity assumed for a region the catalog does not know (gCO2e/kWh)
pub const DEFAULT_REGION_INTENSITY: i32 = 400;

/// Latency assumed for a region the catalog does not know (ms)
pub const DEFAULT_BASE_LATENCY_MS: f64 = 100.0;

/// Power draw model for an instance family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerModel {
    /// Idle draw in watts
    pub baseline_watts: f64,
    /// Additional watts per vCPU at 100% utilization
    pub per_cpu_watts: f64,
    pub vcpus: u32,
}

impl PowerModel {
    /// Model applied to instance types missing from the catalog
    pub const FALLBACK: PowerModel = PowerModel {
        baseline_watts: 30.0,
        per_cpu_watts: 8.0,
        vcpus: 2,
    };

    pub const fn new(baseline_watts: f64, per_cpu_watts: f64, vcpus: u32) -> Self {
        Self {
            baseline_watts,
            per_cpu_watts,
            vcpus,
        }
    }

    /// Power draw in watts at the given CPU utilization percentage
    pub fn watts(&self, cpu_percent: f64) -> f64 {
        self.baseline_watts + self.per_cpu_watts * (cpu_percent / 100.0) * self.vcpus as f64
    }
}

/// A supported cloud region
#[derive(Debug, Clone)]
pub struct RegionSpec {
    pub code: String,
    pub display_name: String,
    /// Annual average grid intensity used when no live row exists
    pub average_intensity: i32,
    /// Round-trip baseline used when the latency feed is unavailable
    pub base_latency_ms: f64,
    /// Filename fragments identifying this region's CSV snapshots
    pub keywords: Vec<String>,
}

/// An on-demand instance type with its hourly price (USD)
#[derive(Debug, Clone)]
pub struct InstanceTypeSpec {
    pub name: String,
    pub cost_per_hour: f64,
}

/// Classification thresholds
#[derive(Debug, Clone)]
pub struct Thresholds {
    /// HIGH risk when cpu or memory exceeds this percentage
    pub risk_high: f64,
    /// MEDIUM risk when cpu or memory exceeds this percentage
    pub risk_medium: f64,
    /// Rightsizing requires cpu below this percentage
    pub rightsizing_cpu: f64,
    /// Rightsizing requires memory below this percentage
    pub rightsizing_memory: f64,
    /// Fraction of CO2e and cost saved by rightsizing
    pub rightsizing_saving_ratio: f64,
    /// Inclusive bounds of the recommendation confidence
    pub confidence_min: f64,
    pub confidence_max: f64,
    /// Forecast hours below this intensity are optimal
    pub forecast_optimal: i32,
    /// Forecast hours above this intensity are peak
    pub forecast_peak: i32,
    /// Intensity reported for regions with no live row when ranking
    pub ranking_missing_intensity: i32,
    /// Scope 3 estimate as a fraction of Scope 2
    pub scope3_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            risk_high: 75.0,
            risk_medium: 40.0,
            rightsizing_cpu: 25.0,
            rightsizing_memory: 40.0,
            rightsizing_saving_ratio: 0.45,
            confidence_min: 72.0,
            confidence_max: 97.0,
            forecast_optimal: 100,
            forecast_peak: 180,
            ranking_missing_intensity: 999,
            scope3_ratio: 0.20,
        }
    }
}

/// Immutable domain configuration
#[derive(Debug, Clone)]
pub struct Catalog {
    regions: Vec<RegionSpec>,
    instance_types: Vec<InstanceTypeSpec>,
    power_models: HashMap<String, PowerModel>,
    fallback_power_model: PowerModel,
    rightsizing: HashMap<String, String>,
    teams: Vec<String>,
    default_settings: Vec<(String, String)>,
    pub thresholds: Thresholds,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The built-in fleet: five regions, five EC2 families
    pub fn builtin() -> Self {
        let region = |code: &str, name: &str, intensity: i32, latency: f64, kw: &[&str]| {
            RegionSpec {
                code: code.to_string(),
                display_name: name.to_string(),
                average_intensity: intensity,
                base_latency_ms: latency,
                keywords: kw.iter().map(|k| k.to_string()).collect(),
            }
        };

        let regions = vec![
            region("IN", "Mumbai (India)", 720, 180.0, &["IN-", "_IN_", "India", "Mumbai"]),
            region("SE", "Stockholm (Sweden)", 13, 90.0, &["SE-", "_SE_", "Sweden", "Stockholm"]),
            region(
                "US",
                "Virginia (US)",
                380,
                20.0,
                &["US-", "_US_", "United States", "USA", "Virginia"],
            ),
            region("IE", "Dublin (Ireland)", 320, 80.0, &["IE-", "_IE_", "Ireland", "Dublin"]),
            region("JP", "Tokyo (Japan)", 500, 150.0, &["JP-", "_JP_", "Japan", "Tokyo"]),
        ];

        let instance_types = [
            ("t3.micro", 0.0104),
            ("t3.medium", 0.0416),
            ("m5.large", 0.0960),
            ("c5.large", 0.0850),
            ("r5.large", 0.1260),
        ]
        .into_iter()
        .map(|(name, cost)| InstanceTypeSpec {
            name: name.to_string(),
            cost_per_hour: cost,
        })
        .collect();

        let power_models = [
            ("t3.micro", PowerModel::new(15.0, 4.0, 2)),
            ("t3.medium", PowerModel::new(20.0, 5.0, 2)),
            ("m5.large", PowerModel::new(50.0, 10.0, 2)),
            ("c5.large", PowerModel::new(45.0, 8.0, 2)),
            ("r5.large", PowerModel::new(55.0, 12.0, 2)),
        ]
        .into_iter()
        .map(|(name, model)| (name.to_string(), model))
        .collect();

        let rightsizing = [
            ("m5.large", "t3.medium"),
            ("c5.large", "t3.medium"),
            ("r5.large", "t3.medium"),
            ("t3.medium", "t3.micro"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        let teams = ["DataScience", "Backend", "Frontend", "Ops", "ML-Training"]
            .into_iter()
            .map(String::from)
            .collect();

        let default_settings = [
            ("carbonBudgetAlertThreshold", "90"),
            ("anomalyDetectionEnabled", "true"),
            ("autoMigrateEnabled", "false"),
            ("rightsizingConfidenceThreshold", "85"),
            ("defaultRegion", "IE"),
            ("reportingCurrency", "USD"),
            ("simClockEnabled", "true"),
            ("awsRoleArn", ""),
            ("awsAccessKeyId", ""),
            ("awsSecretAccessKey", ""),
            ("awsRegionsToMonitor", "US,IE,SE"),
            ("awsCostAllocationTag", "CostCenter"),
            ("electricityMapsApiKey", ""),
            ("cloudflareApiToken", ""),
            ("alertChannel", "email"),
            ("actionOnAnomaly", "alert"),
            ("dataRetentionDays", "90"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            regions,
            instance_types,
            power_models,
            fallback_power_model: PowerModel::FALLBACK,
            rightsizing,
            teams,
            default_settings,
            thresholds: Thresholds::default(),
        }
    }

    /// Regions in catalog order (the order used for ranking ties)
    pub fn regions(&self) -> &[RegionSpec] {
        &self.regions
    }

    pub fn region(&self, code: &str) -> Option<&RegionSpec> {
        self.regions.iter().find(|r| r.code == code)
    }

    pub fn instance_types(&self) -> &[InstanceTypeSpec] {
        &self.instance_types
    }

    pub fn instance_type(&self, name: &str) -> Option<&InstanceTypeSpec> {
        self.instance_types.iter().find(|t| t.name == name)
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn default_settings(&self) -> &[(String, String)] {
        &self.default_settings
    }

    /// Power model for an instance type, or the fallback model
    pub fn power_model(&self, instance_type: &str) -> PowerModel {
        self.power_models
            .get(instance_type)
            .copied()
            .unwrap_or(self.fallback_power_model)
    }

    /// Whether the type has its own power model
    pub fn has_power_model(&self, instance_type: &str) -> bool {
        self.power_models.contains_key(instance_type)
    }

    pub fn power_model_types(&self) -> impl Iterator<Item = &str> {
        self.power_models.keys().map(String::as_str)
    }

    /// Smaller type recommended for an oversized instance type
    pub fn rightsizing_target(&self, instance_type: &str) -> Option<&str> {
        self.rightsizing.get(instance_type).map(String::as_str)
    }

    /// Static average intensity for a region
    pub fn average_intensity(&self, region_code: &str) -> i32 {
        self.region(region_code)
            .map(|r| r.average_intensity)
            .unwrap_or(DEFAULT_REGION_INTENSITY)
    }

    /// Baseline latency for a region
    pub fn base_latency_ms(&self, region_code: &str) -> f64 {
        self.region(region_code)
            .map(|r| r.base_latency_ms)
            .unwrap_or(DEFAULT_BASE_LATENCY_MS)
    }

    /// Infer the region of a CSV snapshot from its filename
    ///
    /// Matching is case-insensitive; the first region (in catalog order)
    /// with a matching keyword wins.
    pub fn region_for_filename(&self, filename: &str) -> Option<&str> {
        let upper = filename.to_uppercase();
        self.regions
            .iter()
            .find(|r| r.keywords.iter().any(|k| upper.contains(&k.to_uppercase())))
            .map(|r| r.code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_uses_fallback_model() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.power_model("x9.huge"), PowerModel::FALLBACK);
        assert!(!catalog.has_power_model("x9.huge"));
    }

    #[test]
    fn test_rightsizing_chain() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.rightsizing_target("m5.large"), Some("t3.medium"));
        assert_eq!(catalog.rightsizing_target("t3.medium"), Some("t3.micro"));
        assert_eq!(catalog.rightsizing_target("t3.micro"), None);
    }

    #[test]
    fn test_region_for_filename() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.region_for_filename("SE-2024-hourly.csv"), Some("SE"));
        assert_eq!(catalog.region_for_filename("ireland_2024.csv"), Some("IE"));
        assert_eq!(catalog.region_for_filename("mars.csv"), None);
    }

    #[test]
    fn test_unknown_region_defaults() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.average_intensity("ZZ"), DEFAULT_REGION_INTENSITY);
        assert_eq!(catalog.base_latency_ms("ZZ"), DEFAULT_BASE_LATENCY_MS);
        assert_eq!(catalog.average_intensity("SE"), 13);
    }
}
