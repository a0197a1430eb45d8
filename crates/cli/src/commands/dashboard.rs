//! Dashboard summary

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, DashboardMetrics};
use crate::output::{format_kg, format_timestamp, print_json, OutputFormat};

pub async fn show_dashboard(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let m: DashboardMetrics = client.get("api/dashboard/metrics").await?;

    if let OutputFormat::Json = format {
        return print_json(&m);
    }

    println!("{}", "SPECTRA Dashboard".bold());
    println!("{}", "=".repeat(50));
    println!("Simulated time:         {}", format_timestamp(&m.sim_now_utc).cyan());
    println!();

    println!("{}", "Emissions".bold());
    println!("{}", "-".repeat(50));
    println!("Today:                  {}", format_kg(m.co2e_today));
    println!("This month:             {}", format_kg(m.co2e_month));
    println!("This year (projected):  {}", format_kg(m.co2e_year));
    let trend = format!("{:+.1}%", m.trend);
    println!(
        "Trend (month/month):    {}",
        if m.trend <= 0.0 { trend.green() } else { trend.red() }
    );
    println!(
        "Scopes 1 / 2 / 3:       {} / {} / {}",
        format_kg(m.scopes.scope1),
        format_kg(m.scopes.scope2),
        format_kg(m.scopes.scope3)
    );
    println!();

    println!("{}", "Budget".bold());
    println!("{}", "-".repeat(50));
    println!("Allocated:              {}", format_kg(m.budget.quarterly));
    println!("Used:                   {}", format_kg(m.budget.used));
    println!("Remaining:              {}", format_kg(m.budget.remaining).green());
    println!();

    println!("{}", "Activity".bold());
    println!("{}", "-".repeat(50));
    println!("Saved this month:       {}", format_kg(m.saved_this_month).green());
    println!("Anomalies detected:     {}", m.anomalies_detected);
    println!("Instances optimized:    {}", m.instances_optimized);
    println!();

    let q = &m.quick_actions;
    println!(
        "{} {} optimization(s), {} anomaly(ies), {} job(s) to reschedule",
        "Pending:".bold(),
        q.pending_optimizations.to_string().yellow(),
        q.active_anomalies.to_string().yellow(),
        q.jobs_to_reschedule.to_string().yellow()
    );

    Ok(())
}
