//! Instance fleet commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, Instance, OptimizeResult};
use crate::output::{color_status, format_kg, print_json, print_rows, print_success, OutputFormat};

/// Row for instances table
#[derive(Tabled)]
struct InstanceRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Type")]
    instance_type: String,
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CO2e/mo")]
    co2e: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Rightsize To")]
    target: String,
}

impl From<&Instance> for InstanceRow {
    fn from(i: &Instance) -> Self {
        Self {
            id: i.id,
            name: i.name.clone(),
            region: i.region_code.clone(),
            instance_type: i.instance_type.clone(),
            team: i.team.clone(),
            status: color_status(&i.status),
            cpu: format!("{:.0}%", i.cpu_utilization),
            co2e: format_kg(i.co2e_per_month),
            risk: color_status(&i.risk),
            target: i
                .recommendation
                .as_ref()
                .map(|r| r.target_type.clone())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Build the list query from the optional filters
fn list_path(region: Option<&str>, risk: Option<&str>, search: Option<&str>) -> String {
    let params: Vec<String> = [("region", region), ("risk", risk), ("search", search)]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| format!("{}={}", k, v)))
        .collect();
    if params.is_empty() {
        "api/instances".to_string()
    } else {
        format!("api/instances?{}", params.join("&"))
    }
}

/// List instances
pub async fn list_instances(
    client: &ApiClient,
    region: Option<String>,
    risk: Option<String>,
    search: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let path = list_path(region.as_deref(), risk.as_deref(), search.as_deref());
    let instances: Vec<Instance> = client.get(&path).await?;
    let rows = instances.iter().map(InstanceRow::from).collect();
    print_rows(rows, &instances, format)
}

/// Apply the pending rightsizing recommendation of an instance
pub async fn optimize_instance(client: &ApiClient, id: i64, format: OutputFormat) -> Result<()> {
    let result: OptimizeResult = client
        .trigger(&format!("api/instances/{}/optimize", id))
        .await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_success(&format!(
            "Instance {} rightsized to {} ({} per month)",
            result.instance.name,
            result.instance.instance_type,
            format_kg(result.instance.co2e_per_month)
        )),
    }
    Ok(())
}
