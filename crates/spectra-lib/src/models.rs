//! Core data models for the SPECTRA backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SpectraError;

/// A cloud region instances can be placed in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub code: String,
    pub display_name: String,
    pub enabled: bool,
}

/// Lifecycle status of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstanceStatus {
    Running,
    Stopped,
}

/// Risk tier derived from utilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => write!(f, "low"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::High => write!(f, "high"),
        }
    }
}

impl FromStr for RiskTier {
    type Err = SpectraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskTier::Low),
            "medium" => Ok(RiskTier::Medium),
            "high" => Ok(RiskTier::High),
            other => Err(SpectraError::validation(format!(
                "Invalid risk '{other}'. Must be one of: low, medium, high"
            ))),
        }
    }
}

/// Pending rightsizing recommendation for an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub target_type: String,
    /// Confidence percentage
    pub confidence: f64,
    /// Monthly kg CO2e saved by applying the recommendation
    pub potential_savings: f64,
    /// Monthly USD saved by applying the recommendation
    pub cost_savings: f64,
}

/// A compute instance in the fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: i64,
    pub name: String,
    pub region_code: String,
    pub instance_type: String,
    pub cost_per_hour: f64,
    pub team: String,
    pub status: InstanceStatus,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    /// Estimated monthly emissions in kg CO2e
    pub co2e_per_month: f64,
    pub recommendation: Option<Recommendation>,
    pub risk: RiskTier,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.status == InstanceStatus::Running
    }
}

/// Filter applied when listing instances
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceFilter {
    pub region: Option<String>,
    pub risk: Option<RiskTier>,
    /// Case-insensitive match on name or instance type
    pub search: Option<String>,
    pub status: Option<InstanceStatus>,
}

impl InstanceFilter {
    pub fn running() -> Self {
        Self {
            status: Some(InstanceStatus::Running),
            ..Default::default()
        }
    }

    pub fn matches(&self, instance: &Instance) -> bool {
        if let Some(region) = &self.region {
            if &instance.region_code != region {
                return false;
            }
        }
        if let Some(risk) = self.risk {
            if instance.risk != risk {
                return false;
            }
        }
        if let Some(status) = self.status {
            if instance.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !instance.name.to_lowercase().contains(&needle)
                && !instance.instance_type.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Hourly grid carbon intensity for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonIntensityHour {
    pub id: i64,
    pub region_code: String,
    pub timestamp_utc: DateTime<Utc>,
    /// gCO2e per kWh
    pub carbon_intensity: i32,
    pub raw_row_json: String,
}

/// A latency observation for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyMetric {
    pub id: i64,
    pub region_code: String,
    pub timestamp_utc: DateTime<Utc>,
    pub latency_ms: f64,
    pub source: String,
    pub raw_json: String,
}

/// Resolution action taken for an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyAction {
    Pending,
    Alerted,
    Restarted,
    AutoKilled,
}

impl AnomalyAction {
    pub const ALL: [AnomalyAction; 4] = [
        AnomalyAction::Pending,
        AnomalyAction::Alerted,
        AnomalyAction::Restarted,
        AnomalyAction::AutoKilled,
    ];

    /// kg CO2e credited once the anomaly is handled this way
    pub fn co2e_saved(&self) -> f64 {
        match self {
            AnomalyAction::Restarted => 12.0,
            AnomalyAction::AutoKilled => 36.0,
            AnomalyAction::Alerted | AnomalyAction::Pending => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyAction::Pending => "pending",
            AnomalyAction::Alerted => "alerted",
            AnomalyAction::Restarted => "restarted",
            AnomalyAction::AutoKilled => "auto_killed",
        }
    }
}

impl fmt::Display for AnomalyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyAction {
    type Err = SpectraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnomalyAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                SpectraError::validation(format!(
                    "Invalid action '{s}'. Must be one of: pending, alerted, restarted, auto_killed"
                ))
            })
    }
}

/// Severity reported by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A detected irregularity on an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub id: i64,
    pub instance_id: String,
    pub instance_name: String,
    pub detected_at_utc: DateTime<Utc>,
    #[serde(rename = "type")]
    pub anomaly_type: String,
    pub score: f64,
    pub expected_value: f64,
    pub actual_value: f64,
    pub severity: Severity,
    pub action: AnomalyAction,
    pub co2e_saved: f64,
}

impl Anomaly {
    /// Record an action; the saved CO2e always follows the action
    pub fn set_action(&mut self, action: AnomalyAction) {
        self.action = action;
        self.co2e_saved = action.co2e_saved();
    }
}

/// A team's quarterly carbon allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamBudget {
    pub id: i64,
    pub team: String,
    pub quarter_year: String,
    /// Allocated kg CO2e
    pub allocated: f64,
    /// Usage at write time; read paths recompute usage from live instances
    pub used_snapshot: f64,
}

/// Audit entry for a region reassignment or an in-place rightsizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationAction {
    pub id: i64,
    pub from_region: String,
    pub to_region: String,
    pub moved_count: u32,
    pub executed_at_utc: DateTime<Utc>,
}

/// How freely a job may be moved in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flexibility {
    Critical,
    Flexible,
    Batch,
}

/// A recurring workload with a carbon-aware schedule recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub id: i64,
    pub name: String,
    pub team: String,
    pub current_schedule: String,
    pub recommended_schedule: String,
    pub duration_hours: f64,
    pub carbon_savings: f64,
    pub flexibility: Flexibility,
    pub accepted: bool,
}

impl ScheduledJob {
    /// Not yet accepted and allowed to move
    pub fn needs_rescheduling(&self) -> bool {
        !self.accepted && self.flexibility != Flexibility::Critical
    }

    /// Adopt the recommended schedule
    pub fn accept_recommendation(&mut self) {
        self.current_schedule = self.recommended_schedule.clone();
        self.accepted = true;
    }
}

/// A key/value configuration entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_action_parse() {
        assert_eq!(
            "auto_killed".parse::<AnomalyAction>().unwrap(),
            AnomalyAction::AutoKilled
        );
        assert!("rebooted".parse::<AnomalyAction>().is_err());
    }

    #[test]
    fn test_anomaly_action_serde_names() {
        let json = serde_json::to_string(&AnomalyAction::AutoKilled).unwrap();
        assert_eq!(json, "\"auto_killed\"");
    }

    #[test]
    fn test_needs_rescheduling() {
        let mut job = ScheduledJob {
            id: 1,
            name: "etl".into(),
            team: "Ops".into(),
            current_schedule: "09:00 UTC".into(),
            recommended_schedule: "22:00 UTC".into(),
            duration_hours: 2.0,
            carbon_savings: 10.0,
            flexibility: Flexibility::Critical,
            accepted: false,
        };
        assert!(!job.needs_rescheduling());

        job.flexibility = Flexibility::Batch;
        assert!(job.needs_rescheduling());

        job.accept_recommendation();
        assert!(!job.needs_rescheduling());
        assert_eq!(job.current_schedule, "22:00 UTC");
    }

    #[test]
    fn test_instance_filter_search_is_case_insensitive() {
        let instance = Instance {
            id: 1,
            name: "ops-web-api-001".into(),
            region_code: "IE".into(),
            instance_type: "m5.large".into(),
            cost_per_hour: 0.096,
            team: "Ops".into(),
            status: InstanceStatus::Running,
            cpu_utilization: 10.0,
            memory_utilization: 10.0,
            co2e_per_month: 10.0,
            recommendation: None,
            risk: RiskTier::Low,
        };
        let filter = InstanceFilter {
            search: Some("WEB".into()),
            ..Default::default()
        };
        assert!(filter.matches(&instance));

        let filter = InstanceFilter {
            search: Some("M5".into()),
            region: Some("US".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&instance));
    }
}
