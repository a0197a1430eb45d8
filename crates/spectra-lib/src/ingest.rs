//! Carbon-intensity CSV import
//!
//! Reads hourly intensity snapshots from a directory. The region comes from
//! the filename and the columns are detected from the header names. Bad rows
//! are counted and skipped; a bad file never stops the import.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::{Result, SpectraError};
use crate::models::CarbonIntensityHour;
use crate::observability::{EventLogger, SpectraMetrics};
use crate::store::SharedStore;

/// Rows written per store call
pub const BATCH_SIZE: usize = 500;

/// Header positions of the timestamp and intensity columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub timestamp: usize,
    pub intensity: usize,
}

/// First header mentioning a timestamp, and first mentioning carbon intensity
pub fn detect_columns(headers: &[String]) -> Option<Columns> {
    let lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let timestamp = lower
        .iter()
        .position(|h| ["timestamp", "datetime", "date"].iter().any(|k| h.contains(k)))?;
    let intensity = lower
        .iter()
        .position(|h| h.contains("carbon") && h.contains("intensity"))?;
    Some(Columns {
        timestamp,
        intensity,
    })
}

/// Parse an ISO-8601 timestamp; values without an offset are taken as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse an intensity value, truncating towards zero
pub fn parse_intensity(value: &str) -> Option<i32> {
    let parsed: f64 = value.trim().parse().ok()?;
    if !parsed.is_finite() || parsed.abs() > i32::MAX as f64 {
        return None;
    }
    Some(parsed.trunc() as i32)
}

/// Parsed rows of one file, ready to insert
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub rows: Vec<CarbonIntensityHour>,
    pub skipped: usize,
}

/// Parse a CSV body for a known region
///
/// Quoted fields may contain commas, `""` escapes and newlines. Returns
/// `None` when the header lacks a timestamp or intensity column.
pub fn parse_csv(region_code: &str, text: &str) -> Option<ParsedFile> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers: Vec<String> = reader.headers().ok()?.iter().map(str::to_string).collect();
    let columns = detect_columns(&headers)?;

    let mut parsed = ParsedFile::default();
    for record in reader.records() {
        let Ok(record) = record else {
            parsed.skipped += 1;
            continue;
        };
        let field = |i: usize| record.get(i).unwrap_or("");

        let (Some(timestamp_utc), Some(carbon_intensity)) = (
            parse_timestamp(field(columns.timestamp)),
            parse_intensity(field(columns.intensity)),
        ) else {
            parsed.skipped += 1;
            continue;
        };

        let raw: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), Value::String(field(i).to_string())))
            .collect();

        parsed.rows.push(CarbonIntensityHour {
            id: 0,
            region_code: region_code.to_string(),
            timestamp_utc,
            carbon_intensity,
            raw_row_json: Value::Object(raw).to_string(),
        });
    }
    Some(parsed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum FileStatus {
    Imported,
    NoRegion,
    MissingColumns,
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: String,
    pub region_code: Option<String>,
    pub imported: usize,
    pub skipped: usize,
    #[serde(flatten)]
    pub status: FileStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub files: Vec<FileReport>,
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct CsvImporter {
    store: SharedStore,
    catalog: Arc<Catalog>,
    metrics: SpectraMetrics,
    logger: EventLogger,
}

impl CsvImporter {
    pub fn new(store: SharedStore, catalog: Arc<Catalog>, logger: EventLogger) -> Self {
        Self {
            store,
            catalog,
            metrics: SpectraMetrics::new(),
            logger,
        }
    }

    /// Import every `*.csv` in `dir`, in filename order
    ///
    /// A missing directory imports nothing.
    pub async fn import_dir(&self, dir: &Path) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "CSV directory does not exist, skipping import");
            return Ok(summary);
        }

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| SpectraError::Storage(format!("reading {}: {e}", dir.display())))?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SpectraError::Storage(e.to_string()))?
        {
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        for path in files {
            let report = self.import_file(&path).await?;
            summary.imported += report.imported;
            summary.skipped += report.skipped;
            summary.files.push(report);
        }

        self.metrics.record_import(summary.imported, summary.skipped);
        Ok(summary)
    }

    async fn import_file(&self, path: &Path) -> Result<FileReport> {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut report = FileReport {
            file: file.clone(),
            region_code: None,
            imported: 0,
            skipped: 0,
            status: FileStatus::Imported,
        };

        let Some(region) = self.catalog.region_for_filename(&file) else {
            tracing::warn!(file = %file, "Skipping CSV: no region keyword in filename");
            report.status = FileStatus::NoRegion;
            return Ok(report);
        };
        report.region_code = Some(region.to_string());

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %file, error = %e, "Skipping unreadable CSV");
                report.status = FileStatus::Unreadable(e.to_string());
                return Ok(report);
            }
        };

        let Some(parsed) = parse_csv(region, &text) else {
            tracing::warn!(file = %file, "Skipping CSV: timestamp or carbon intensity column not found");
            report.status = FileStatus::MissingColumns;
            return Ok(report);
        };

        report.skipped = parsed.skipped;
        let mut rows = parsed.rows;
        while !rows.is_empty() {
            let rest = rows.split_off(rows.len().min(BATCH_SIZE));
            report.imported += self.store.insert_intensity_batch(rows).await?;
            rows = rest;
        }

        self.logger
            .log_import(&file, region, report.imported, report.skipped);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::fs;

    #[test]
    fn test_parse_csv_quoted_fields() {
        let text = "Datetime (UTC),Carbon Intensity,Note\n\
2024-01-01T00:00:00Z,30,\"line1\nline2\"\n\
2024-01-01T01:00:00Z,31,\"a, \"\"quoted\"\" b\"\n";
        let parsed = parse_csv("SE", text).unwrap();
        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.rows.len(), 2);

        let first: Value = serde_json::from_str(&parsed.rows[0].raw_row_json).unwrap();
        assert_eq!(first["Note"], "line1\nline2");
        let second: Value = serde_json::from_str(&parsed.rows[1].raw_row_json).unwrap();
        assert_eq!(second["Note"], "a, \"quoted\" b");
        assert_eq!(parsed.rows[1].carbon_intensity, 31);
    }

    #[test]
    fn test_parse_csv_strips_bom() {
        let text = "\u{feff}timestamp,carbon intensity\n2024-01-01T00:00:00Z,12\n";
        let parsed = parse_csv("SE", text).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.rows[0].raw_row_json.contains("\"timestamp\""));
    }

    #[test]
    fn test_detect_columns() {
        let headers: Vec<String> = [
            "Zone id",
            "Datetime (UTC)",
            "Carbon Intensity gCO₂eq/kWh (direct)",
            "Carbon Intensity gCO₂eq/kWh (LCA)",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(
            detect_columns(&headers),
            Some(Columns {
                timestamp: 1,
                intensity: 2
            })
        );
        assert_eq!(detect_columns(&["zone".to_string()]), None);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T05:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 05:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T07:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("not-a-date"), None);
    }

    #[test]
    fn test_parse_intensity_truncates() {
        assert_eq!(parse_intensity("123.9"), Some(123));
        assert_eq!(parse_intensity(" 7 "), Some(7));
        assert_eq!(parse_intensity("n/a"), None);
        assert_eq!(parse_intensity("NaN"), None);
    }

    #[test]
    fn test_parse_csv_skips_bad_rows_and_continues() {
        let text = "\
Datetime (UTC),Carbon Intensity gCO2eq/kWh (direct)
2024-01-01T00:00:00Z,30.5
garbage,31
2024-01-01T02:00:00Z,
2024-01-01T03:00:00Z,33
";
        let parsed = parse_csv("SE", text).unwrap();
        assert_eq!(parsed.skipped, 2);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].carbon_intensity, 30);
        assert_eq!(parsed.rows[1].carbon_intensity, 33);

        let raw: Value = serde_json::from_str(&parsed.rows[1].raw_row_json).unwrap();
        assert_eq!(raw["Datetime (UTC)"], "2024-01-01T03:00:00Z");
    }

    #[tokio::test]
    async fn test_import_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("SE-2024_hourly.csv"),
            "datetime,carbon_intensity_avg\n2024-01-01T00:00:00Z,20\n2024-01-01T01:00:00Z,bad\n",
        )
        .unwrap();
        fs::write(dir.path().join("mars_2024.csv"), "datetime,carbon_intensity\n").unwrap();
        fs::write(dir.path().join("Ireland_2024.csv"), "when,value\n1,2\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = MemoryStore::shared();
        let importer = CsvImporter::new(
            store.clone(),
            Arc::new(Catalog::builtin()),
            EventLogger::default(),
        );
        let summary = importer.import_dir(dir.path()).await.unwrap();

        assert_eq!(summary.files.len(), 3);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.count_intensity().await.unwrap(), 1);

        let by_name = |name: &str| summary.files.iter().find(|f| f.file == name).unwrap();
        assert_eq!(by_name("Ireland_2024.csv").status, FileStatus::MissingColumns);
        assert_eq!(by_name("mars_2024.csv").status, FileStatus::NoRegion);
        assert_eq!(by_name("SE-2024_hourly.csv").region_code.as_deref(), Some("SE"));
    }

    #[tokio::test]
    async fn test_import_missing_dir_is_empty() {
        let importer = CsvImporter::new(
            MemoryStore::shared(),
            Arc::new(Catalog::builtin()),
            EventLogger::default(),
        );
        let summary = importer
            .import_dir(Path::new("/nonexistent/spectra/csv"))
            .await
            .unwrap();
        assert!(summary.files.is_empty());
    }

    #[tokio::test]
    async fn test_large_file_is_batched() {
        let mut text = String::from("timestamp,carbon intensity\n");
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for h in 0..1_234 {
            let at = start + chrono::Duration::hours(h);
            text.push_str(&format!("{},{}\n", at.to_rfc3339(), h % 400));
        }
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("US-2024.csv"), text).unwrap();

        let store = MemoryStore::shared();
        let importer = CsvImporter::new(
            store.clone(),
            Arc::new(Catalog::builtin()),
            EventLogger::default(),
        );
        let summary = importer.import_dir(dir.path()).await.unwrap();
        assert_eq!(summary.imported, 1_234);
        assert_eq!(store.count_intensity().await.unwrap(), 1_234);
    }
}
