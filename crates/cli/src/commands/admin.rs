//! Operator triggers

use anyhow::Result;
use serde_json::Value;

use crate::client::ApiClient;
use crate::output::{format_timestamp, print_json, print_success, print_warning, OutputFormat};

/// Import CSV snapshots and seed any empty tables
pub async fn import(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: Value = client.trigger("api/admin/import").await?;
    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_success(&format!(
            "Imported {} row(s), skipped {}",
            result["import"]["imported"], result["import"]["skipped"]
        )),
    }
    Ok(())
}

/// Advance the simulated clock
pub async fn tick(client: &ApiClient, hours: u32, format: OutputFormat) -> Result<()> {
    let result: Value = client
        .trigger(&format!("api/admin/tick?hours={}", hours))
        .await?;
    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let now = result["simNowUtc"].as_str().unwrap_or_default();
            print_success(&format!("Simulated clock at {}", format_timestamp(now)));
        }
    }
    Ok(())
}

/// Refresh latency readings for every region now
pub async fn fetch_latency(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: Value = client.trigger("api/admin/latency/fetch-now").await?;
    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let fallbacks = result["fallbacks"].as_u64().unwrap_or(0);
            print_success(&format!("Latency refreshed for {} region(s)", result["regions"]));
            if fallbacks > 0 {
                print_warning(&format!("{} region(s) fell back to baseline latency", fallbacks));
            }
        }
    }
    Ok(())
}
