//! Region migration commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, MigrationHistory, MigrationRequest, MigrationResult};
use crate::output::{format_timestamp, print_info, print_json, print_rows, print_success, print_warning, OutputFormat};

#[derive(Tabled)]
struct MigrationRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Moved")]
    moved: u32,
    #[tabled(rename = "Executed")]
    executed: String,
}

/// Move every running instance from one region to another
pub async fn execute(client: &ApiClient, from: &str, to: &str, format: OutputFormat) -> Result<()> {
    let request = MigrationRequest {
        from_region: from.to_uppercase(),
        to_region: to.to_uppercase(),
        mode: "ALL_RUNNING".to_string(),
    };
    let result: MigrationResult = client.post("api/migrations/execute", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table if result.moved == 0 => print_warning(&format!(
            "No running instances in {}; nothing moved",
            result.from_region
        )),
        OutputFormat::Table => print_success(&format!(
            "Moved {} instance(s) from {} to {}",
            result.moved, result.from_region, result.to_region
        )),
    }
    Ok(())
}

/// Show the migration audit log, newest first
pub async fn history(client: &ApiClient, limit: usize, offset: usize, format: OutputFormat) -> Result<()> {
    let page: MigrationHistory = client
        .get(&format!("api/migrations/history?limit={}&offset={}", limit, offset))
        .await?;

    if let OutputFormat::Table = format {
        print_info(&format!(
            "Showing {} of {} record(s)",
            page.records.len(),
            page.total
        ));
    }
    let rows = page
        .records
        .iter()
        .map(|r| MigrationRow {
            id: r.id,
            from: r.from_region.clone(),
            to: r.to_region.clone(),
            moved: r.moved_count,
            executed: format_timestamp(&r.executed_at_utc),
        })
        .collect();
    print_rows(rows, &page, format)
}
