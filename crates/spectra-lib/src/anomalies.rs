//! Anomaly feed and resolution actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::estimator::round2;
use crate::models::{Anomaly, AnomalyAction, Severity};
use crate::store::SharedStore;

/// Filter on resolution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyStatus {
    Pending,
    Resolved,
}

impl AnomalyStatus {
    fn matches(&self, anomaly: &Anomaly) -> bool {
        match self {
            AnomalyStatus::Pending => anomaly.action == AnomalyAction::Pending,
            AnomalyStatus::Resolved => anomaly.action != AnomalyAction::Pending,
        }
    }
}

/// Anomaly reported by a detector or an operator
///
/// There is no way to supply the saved CO2e; it follows the action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnomaly {
    pub instance_id: String,
    pub instance_name: String,
    #[serde(rename = "type")]
    pub anomaly_type: String,
    pub score: f64,
    pub expected_value: f64,
    pub actual_value: f64,
    pub severity: Severity,
    #[serde(default = "pending")]
    pub action: AnomalyAction,
    pub detected_at_utc: Option<DateTime<Utc>>,
}

fn pending() -> AnomalyAction {
    AnomalyAction::Pending
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyStats {
    pub total: usize,
    pub pending: usize,
    pub resolved: usize,
    pub total_co2e_saved: f64,
}

#[derive(Clone)]
pub struct AnomalyService {
    store: SharedStore,
}

impl AnomalyService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Anomalies newest first, optionally filtered by resolution state
    pub async fn list(&self, status: Option<AnomalyStatus>) -> Result<Vec<Anomaly>> {
        let mut anomalies: Vec<Anomaly> = self
            .store
            .list_anomalies()
            .await?
            .into_iter()
            .filter(|a| status.map_or(true, |s| s.matches(a)))
            .collect();
        anomalies.sort_by(|a, b| {
            b.detected_at_utc
                .cmp(&a.detected_at_utc)
                .then(b.id.cmp(&a.id))
        });
        Ok(anomalies)
    }

    pub async fn create(&self, new: NewAnomaly) -> Result<Anomaly> {
        if new.instance_id.trim().is_empty() {
            return Err(SpectraError::validation("instanceId is required"));
        }
        let mut anomaly = Anomaly {
            id: 0,
            instance_id: new.instance_id,
            instance_name: new.instance_name,
            detected_at_utc: new.detected_at_utc.unwrap_or_else(Utc::now),
            anomaly_type: new.anomaly_type,
            score: new.score,
            expected_value: new.expected_value,
            actual_value: new.actual_value,
            severity: new.severity,
            action: AnomalyAction::Pending,
            co2e_saved: 0.0,
        };
        anomaly.set_action(new.action);
        self.store.insert_anomaly(anomaly).await
    }

    /// Record an action by name; the saved CO2e is reset from the action
    pub async fn set_action(&self, id: i64, action: &str) -> Result<Anomaly> {
        let action: AnomalyAction = action.parse()?;
        let mut anomaly = self
            .store
            .get_anomaly(id)
            .await?
            .ok_or_else(|| SpectraError::not_found("Anomaly not found"))?;
        anomaly.set_action(action);
        self.store.update_anomaly(&anomaly).await?;
        Ok(anomaly)
    }

    pub async fn stats(&self) -> Result<AnomalyStats> {
        let anomalies = self.store.list_anomalies().await?;
        let total = anomalies.len();
        let pending = anomalies
            .iter()
            .filter(|a| a.action == AnomalyAction::Pending)
            .count();
        Ok(AnomalyStats {
            total,
            pending,
            resolved: total - pending,
            total_co2e_saved: round2(anomalies.iter().map(|a| a.co2e_saved).sum()),
        })
    }
}
