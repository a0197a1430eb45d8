//! Region signal, latency and ranking commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, LatestSignals, RankedRegion, RegionLatency, RegionRecommendation};
use crate::output::{color_intensity, color_status, format_timestamp, print_rows, print_info, OutputFormat};

#[derive(Tabled)]
struct SignalRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Region")]
    name: String,
    #[tabled(rename = "gCO2e/kWh")]
    intensity: String,
}

#[derive(Tabled)]
struct LatencyRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Observed")]
    observed: String,
}

#[derive(Tabled)]
struct RankingRow {
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "gCO2e/kWh")]
    intensity: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "$/h")]
    cost: String,
    #[tabled(rename = "Workloads")]
    workloads: usize,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
}

/// Current grid intensity per region at the simulated clock
pub async fn show_signals(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let signals: LatestSignals = client.get("api/regions/signals/latest").await?;
    if let OutputFormat::Table = format {
        print_info(&format!("Simulated time: {}", format_timestamp(&signals.sim_now_utc)));
    }
    let rows = signals
        .regions
        .iter()
        .map(|r| SignalRow {
            code: r.code.clone(),
            name: r.display_name.clone(),
            intensity: color_intensity(r.carbon_intensity),
        })
        .collect();
    print_rows(rows, &signals, format)
}

/// Latest latency reading per region
pub async fn show_latency(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let latency: Vec<RegionLatency> = client.get("api/regions/latency/latest").await?;
    let rows = latency
        .iter()
        .map(|r| LatencyRow {
            code: r.code.clone(),
            latency: r
                .latency_ms
                .map(|ms| format!("{:.1} ms", ms))
                .unwrap_or_else(|| "n/a".to_string()),
            observed: r
                .timestamp_utc
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_rows(rows, &latency, format)
}

/// Regions ranked by carbon intensity with placement advice
pub async fn show_ranking(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let ranking: Vec<RankedRegion> = client.get("api/optimizer/regions").await?;
    let rows = ranking
        .iter()
        .map(|r| RankingRow {
            region: format!("{} ({})", r.region, r.region_code),
            intensity: color_intensity(Some(r.carbon_intensity)),
            latency: format!("{:.0} ms", r.latency),
            cost: format!("{:.4}", r.cost_per_hour),
            workloads: r.workloads,
            recommendation: match &r.recommendation {
                RegionRecommendation::Optimal => color_status("OPTIMAL"),
                RegionRecommendation::Migrate { target_code, .. } => {
                    format!("{} -> {}", color_status("MIGRATE"), target_code)
                }
            },
        })
        .collect();
    print_rows(rows, &ranking, format)
}
