//! Region latency feed
//!
//! Latency is read from an external radar API when a token is configured.
//! Any failure degrades to the region's baseline latency; callers never see
//! an upstream error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::Catalog;
use crate::clock::sub_days;
use crate::error::{Result, SpectraError};
use crate::intensity::enabled_regions;
use crate::models::LatencyMetric;
use crate::observability::{EventLogger, SpectraMetrics};
use crate::store::SharedStore;

/// Default radar endpoint for latency summaries
pub const DEFAULT_RADAR_ENDPOINT: &str =
    "https://api.cloudflare.com/client/v4/radar/quality/iqi/summary";

pub const SOURCE_RADAR: &str = "cloudflare_radar";
pub const SOURCE_BASELINE: &str = "baseline";

/// A single latency reading
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyReading {
    pub latency_ms: f64,
    pub source: String,
    pub raw_json: String,
}

/// Anything able to report the current latency of a region
#[async_trait]
pub trait LatencySource: Send + Sync {
    /// Latency for a region; implementations recover from failures themselves
    async fn fetch(&self, region_code: &str) -> LatencyReading;
}

/// Radar API client with baseline fallback
pub struct RadarClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    catalog: Arc<Catalog>,
    metrics: SpectraMetrics,
    logger: EventLogger,
}

impl RadarClient {
    pub fn new(
        catalog: Arc<Catalog>,
        endpoint: impl Into<String>,
        token: Option<String>,
        logger: EventLogger,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| SpectraError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: token.filter(|t| !t.trim().is_empty()),
            catalog,
            metrics: SpectraMetrics::new(),
            logger,
        })
    }

    fn baseline(&self, region_code: &str, reason: &str) -> LatencyReading {
        self.metrics.inc_latency_fallbacks();
        self.logger.log_latency_fallback(region_code, reason);
        LatencyReading {
            latency_ms: self.catalog.base_latency_ms(region_code),
            source: SOURCE_BASELINE.to_string(),
            raw_json: serde_json::json!({ "fallback": reason }).to_string(),
        }
    }

    async fn query(&self, token: &str, region_code: &str) -> Result<(f64, String)> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("metric", "latency"),
                ("location", region_code),
                ("dateRange", "1d"),
            ])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SpectraError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpectraError::Upstream(format!("radar returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SpectraError::Upstream(e.to_string()))?;
        let latency = parse_radar_latency(&body)
            .ok_or_else(|| SpectraError::Upstream("unrecognised radar response".to_string()))?;
        Ok((latency, body))
    }
}

#[async_trait]
impl LatencySource for RadarClient {
    async fn fetch(&self, region_code: &str) -> LatencyReading {
        let Some(token) = self.token.as_deref() else {
            return self.baseline(region_code, "no radar token configured");
        };

        match self.query(token, region_code).await {
            Ok((latency_ms, raw_json)) => LatencyReading {
                latency_ms,
                source: SOURCE_RADAR.to_string(),
                raw_json,
            },
            Err(e) => self.baseline(region_code, &e.to_string()),
        }
    }
}

/// Extract the median latency from a radar summary body
///
/// Accepts `result.summary_0.p50` as a number or a numeric string.
pub fn parse_radar_latency(body: &str) -> Option<f64> {
    let value: Value = serde_json::from_str(body).ok()?;
    let p50 = value.get("result")?.get("summary_0")?.get("p50")?;
    let latency: Option<f64> = match p50 {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    latency.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Latest latency of one region
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionLatency {
    pub code: String,
    pub latency_ms: Option<f64>,
    pub timestamp_utc: Option<DateTime<Utc>>,
}

/// Outcome of one refresh pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub regions: usize,
    pub fallbacks: usize,
}

/// Latency persistence and queries
#[derive(Clone)]
pub struct LatencyService {
    store: SharedStore,
    catalog: Arc<Catalog>,
    source: Arc<dyn LatencySource>,
    metrics: SpectraMetrics,
}

impl LatencyService {
    pub fn new(store: SharedStore, catalog: Arc<Catalog>, source: Arc<dyn LatencySource>) -> Self {
        Self {
            store,
            catalog,
            source,
            metrics: SpectraMetrics::new(),
        }
    }

    /// Append one reading per enabled region, stamped with `now`
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<RefreshSummary> {
        let started = Instant::now();
        let mut summary = RefreshSummary {
            regions: 0,
            fallbacks: 0,
        };

        for region in enabled_regions(&self.store, &self.catalog).await? {
            let reading = self.source.fetch(&region.code).await;
            if reading.source == SOURCE_BASELINE {
                summary.fallbacks += 1;
            }
            self.store
                .insert_latency(LatencyMetric {
                    id: 0,
                    region_code: region.code,
                    timestamp_utc: now,
                    latency_ms: reading.latency_ms,
                    source: reading.source,
                    raw_json: reading.raw_json,
                })
                .await?;
            summary.regions += 1;
        }

        self.metrics
            .observe_latency_refresh(started.elapsed().as_secs_f64());
        Ok(summary)
    }

    /// Most recent latency for a region, 0.0 when none was recorded
    pub async fn latest_ms(&self, region_code: &str) -> Result<f64> {
        Ok(self
            .store
            .latest_latency(region_code)
            .await?
            .map_or(0.0, |m| m.latency_ms))
    }

    pub async fn latest(&self) -> Result<Vec<RegionLatency>> {
        let mut out = Vec::new();
        for region in enabled_regions(&self.store, &self.catalog).await? {
            let latest = self.store.latest_latency(&region.code).await?;
            out.push(RegionLatency {
                code: region.code,
                latency_ms: latest.as_ref().map(|m| m.latency_ms),
                timestamp_utc: latest.map(|m| m.timestamp_utc),
            });
        }
        Ok(out)
    }

    /// Readings from the last `days` days before `now`, ascending
    pub async fn history(
        &self,
        region_code: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<LatencyMetric>> {
        if days < 1 {
            return Err(SpectraError::validation("days must be at least 1"));
        }
        self.store
            .latency_since(region_code, sub_days(now, days)?)
            .await
    }
}
