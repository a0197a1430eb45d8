//! Carbon-aware scheduling commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ForecastHour, ScheduledJob};
use crate::output::{color_intensity, format_kg, format_timestamp, print_json, print_rows, print_success, OutputFormat};

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Job")]
    name: String,
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Recommended")]
    recommended: String,
    #[tabled(rename = "Saving")]
    savings: String,
    #[tabled(rename = "Flexibility")]
    flexibility: String,
    #[tabled(rename = "Accepted")]
    accepted: String,
}

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "+h")]
    hour: usize,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "gCO2e/kWh")]
    intensity: String,
    #[tabled(rename = "Window")]
    window: String,
}

pub async fn list_jobs(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let jobs: Vec<ScheduledJob> = client.get("api/scheduler/jobs").await?;
    let rows = jobs
        .iter()
        .map(|j| JobRow {
            id: j.id,
            name: j.name.clone(),
            team: j.team.clone(),
            current: j.current_schedule.clone(),
            recommended: j.recommended_schedule.clone(),
            savings: format_kg(j.carbon_savings),
            flexibility: j.flexibility.clone(),
            accepted: if j.accepted {
                "yes".green().to_string()
            } else {
                "no".to_string()
            },
        })
        .collect();
    print_rows(rows, &jobs, format)
}

/// Adopt the recommended schedule of a job
pub async fn accept_job(client: &ApiClient, id: i64, format: OutputFormat) -> Result<()> {
    let job: ScheduledJob = client
        .trigger(&format!("api/scheduler/jobs/{}/accept", id))
        .await?;
    match format {
        OutputFormat::Json => print_json(&job)?,
        OutputFormat::Table => print_success(&format!(
            "{} now runs at {}",
            job.name, job.current_schedule
        )),
    }
    Ok(())
}

/// 24-hour intensity forecast; the API picks the greenest region when none is given
pub async fn show_forecast(client: &ApiClient, region: Option<String>, format: OutputFormat) -> Result<()> {
    let path = match &region {
        Some(code) => format!("api/scheduler/forecast?region={}", code.to_uppercase()),
        None => "api/scheduler/forecast".to_string(),
    };
    let forecast: Vec<ForecastHour> = client.get(&path).await?;
    let rows = forecast
        .iter()
        .map(|h| ForecastRow {
            hour: h.hour,
            time: format_timestamp(&h.timestamp_utc),
            intensity: color_intensity(Some(h.intensity)),
            window: if h.is_optimal {
                "optimal".green().to_string()
            } else if h.is_peak {
                "peak".red().to_string()
            } else {
                String::new()
            },
        })
        .collect();
    print_rows(rows, &forecast, format)
}
