//! Team budget commands

use anyhow::{Context, Result};
use tabled::Tabled;

use crate::client::{ApiClient, BudgetView};
use crate::output::{color_pct, format_kg, print_rows, print_success, OutputFormat};

#[derive(Tabled)]
struct BudgetRow {
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Quarter")]
    quarter: String,
    #[tabled(rename = "Allocated")]
    allocated: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
    #[tabled(rename = "Instances")]
    instances: usize,
    #[tabled(rename = "Used %")]
    pct: String,
}

fn quarter_query(quarter: Option<&str>) -> String {
    quarter
        .map(|q| format!("?quarter={}", q))
        .unwrap_or_default()
}

/// Budgets for a quarter (the current one by default) with live usage
pub async fn list_budgets(client: &ApiClient, quarter: Option<String>, format: OutputFormat) -> Result<()> {
    let budgets: Vec<BudgetView> = client
        .get(&format!("api/budgets{}", quarter_query(quarter.as_deref())))
        .await?;
    let rows = budgets
        .iter()
        .map(|b| BudgetRow {
            team: b.team.clone(),
            quarter: b.quarter_year.clone(),
            allocated: format_kg(b.allocated),
            used: format_kg(b.used),
            remaining: format_kg(b.remaining),
            instances: b.instances,
            pct: color_pct(b.pct_used),
        })
        .collect();
    print_rows(rows, &budgets, format)
}

/// Download the chargeback CSV to stdout or a file
pub async fn export_budgets(client: &ApiClient, quarter: Option<String>, output: Option<String>) -> Result<()> {
    let csv = client
        .get_text(&format!("api/budgets/export{}", quarter_query(quarter.as_deref())))
        .await?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, csv)
                .await
                .with_context(|| format!("Failed to write {}", path))?;
            print_success(&format!("Chargeback report written to {}", path));
        }
        None => print!("{}", csv),
    }
    Ok(())
}
