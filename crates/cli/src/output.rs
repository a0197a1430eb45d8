//! Output formatting utilities

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table, or the raw API payload as JSON
pub fn print_rows<R: Tabled, P: Serialize + ?Sized>(
    rows: Vec<R>,
    payload: &P,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(payload)?,
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No items found".yellow());
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
    }
    Ok(())
}

pub fn print_json<P: Serialize + ?Sized>(payload: &P) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format kilograms of CO2e
pub fn format_kg(kg: f64) -> String {
    if kg >= 1000.0 {
        format!("{:.2} t", kg / 1000.0)
    } else {
        format!("{:.2} kg", kg)
    }
}

/// Color a grid intensity by how dirty it is
pub fn color_intensity(intensity: Option<i32>) -> String {
    match intensity {
        None => "n/a".dimmed().to_string(),
        Some(v) if v < 100 => v.to_string().green().to_string(),
        Some(v) if v < 400 => v.to_string().yellow().to_string(),
        Some(v) => v.to_string().red().to_string(),
    }
}

/// Color risk tiers and statuses
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "low" | "running" | "optimal" | "accepted" => status.green().to_string(),
        "medium" | "pending" => status.yellow().to_string(),
        "high" | "stopped" | "migrate" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Render percentage usage, red once over budget
pub fn color_pct(pct: f64) -> String {
    let formatted = format!("{:.1}%", pct);
    if pct > 100.0 {
        formatted.red().to_string()
    } else if pct >= 80.0 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Shorten an RFC 3339 timestamp for tables; unparseable input is returned unchanged
pub fn format_timestamp(ts: &str) -> String {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| {
            dt.with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M UTC")
                .to_string()
        })
        .unwrap_or_else(|_| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_kg() {
        assert_eq!(format_kg(12.345), "12.35 kg");
        assert_eq!(format_kg(2500.0), "2.50 t");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2024-01-01T02:00:00Z"),
            "2024-01-01 02:00 UTC"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
