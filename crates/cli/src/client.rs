//! HTTP client for the SPECTRA API

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the SPECTRA backend
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        Ok(response)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = Self::send(self.client.get(self.url(path)?)).await?;
        response.json().await.context("Failed to parse response")
    }

    /// GET a non-JSON body such as the chargeback CSV
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let response = Self::send(self.client.get(self.url(path)?)).await?;
        response.text().await.context("Failed to read response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = Self::send(self.client.post(self.url(path)?).json(body)).await?;
        response.json().await.context("Failed to parse response")
    }

    /// POST without a body
    pub async fn trigger<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = Self::send(self.client.post(self.url(path)?)).await?;
        response.json().await.context("Failed to parse response")
    }

    /// Make a PATCH request with JSON body
    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = Self::send(self.client.patch(self.url(path)?).json(body)).await?;
        response.json().await.context("Failed to parse response")
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = Self::send(self.client.put(self.url(path)?).json(body)).await?;
        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub target_type: String,
    pub confidence: f64,
    pub potential_savings: f64,
    pub cost_savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: i64,
    pub name: String,
    pub region_code: String,
    pub instance_type: String,
    pub team: String,
    pub status: String,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    pub co2e_per_month: f64,
    pub recommendation: Option<Recommendation>,
    pub risk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResult {
    pub optimized: bool,
    pub instance: Instance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRegion {
    pub region: String,
    pub region_code: String,
    pub carbon_intensity: i32,
    pub latency: f64,
    pub cost_per_hour: f64,
    pub workloads: usize,
    pub recommendation: RegionRecommendation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RegionRecommendation {
    Optimal,
    #[serde(rename_all = "camelCase")]
    Migrate { target: String, target_code: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSignal {
    pub code: String,
    pub display_name: String,
    pub carbon_intensity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestSignals {
    pub sim_now_utc: String,
    pub regions: Vec<RegionSignal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionLatency {
    pub code: String,
    pub latency_ms: Option<f64>,
    pub timestamp_utc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRequest {
    pub from_region: String,
    pub to_region: String,
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub moved: u32,
    pub from_region: String,
    pub to_region: String,
    pub executed_at_utc: String,
    pub audited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub id: i64,
    pub from_region: String,
    pub to_region: String,
    pub moved_count: u32,
    pub executed_at_utc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationHistory {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub records: Vec<MigrationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub id: i64,
    pub name: String,
    pub team: String,
    pub current_schedule: String,
    pub recommended_schedule: String,
    pub duration_hours: f64,
    pub carbon_savings: f64,
    pub flexibility: String,
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastHour {
    pub hour: usize,
    pub timestamp_utc: String,
    pub region_code: String,
    pub intensity: i32,
    pub is_optimal: bool,
    pub is_peak: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    pub id: i64,
    pub team: String,
    pub allocated: f64,
    pub used: f64,
    pub remaining: f64,
    pub instances: usize,
    pub quarter_year: String,
    pub pct_used: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetTotals {
    pub quarterly: f64,
    pub used: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scopes {
    pub scope1: f64,
    pub scope2: f64,
    pub scope3: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActions {
    pub pending_optimizations: usize,
    pub active_anomalies: usize,
    pub jobs_to_reschedule: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub sim_now_utc: String,
    pub co2e_today: f64,
    pub co2e_month: f64,
    pub co2e_year: f64,
    /// Month-over-month change, percent
    #[serde(default)]
    pub trend: f64,
    pub budget: BudgetTotals,
    pub scopes: Scopes,
    pub saved_this_month: f64,
    pub anomalies_detected: usize,
    pub instances_optimized: usize,
    pub quick_actions: QuickActions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
