//! Observability infrastructure for the SPECTRA backend
//!
//! Provides:
//! - Prometheus metrics (clock ticks, migrations, rightsizing, imports, latency feed)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec, Gauge,
    Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for latency refresh duration (in seconds)
const REFRESH_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SpectraMetricsInner> = OnceLock::new();

struct SpectraMetricsInner {
    clock_ticks: IntCounter,
    sim_time_seconds: Gauge,
    migrations_executed: IntCounter,
    instances_moved: IntCounter,
    rightsizing_applied: IntCounter,
    csv_rows_imported: IntCounter,
    csv_rows_skipped: IntCounter,
    latency_fallbacks: IntCounter,
    latency_refresh_seconds: Histogram,
    background_job_failures: IntCounterVec,
}

impl SpectraMetricsInner {
    fn new() -> Self {
        Self {
            clock_ticks: register_int_counter!(
                "spectra_sim_clock_ticks_total",
                "Number of times the simulation clock advanced"
            )
            .expect("Failed to register sim_clock_ticks_total"),

            sim_time_seconds: register_gauge!(
                "spectra_sim_time_seconds",
                "Current simulated time as a Unix timestamp"
            )
            .expect("Failed to register sim_time_seconds"),

            migrations_executed: register_int_counter!(
                "spectra_migrations_executed_total",
                "Region migrations executed"
            )
            .expect("Failed to register migrations_executed_total"),

            instances_moved: register_int_counter!(
                "spectra_instances_moved_total",
                "Instances reassigned by region migrations"
            )
            .expect("Failed to register instances_moved_total"),

            rightsizing_applied: register_int_counter!(
                "spectra_rightsizing_applied_total",
                "Rightsizing recommendations applied"
            )
            .expect("Failed to register rightsizing_applied_total"),

            csv_rows_imported: register_int_counter!(
                "spectra_csv_rows_imported_total",
                "Carbon-intensity rows imported from CSV"
            )
            .expect("Failed to register csv_rows_imported_total"),

            csv_rows_skipped: register_int_counter!(
                "spectra_csv_rows_skipped_total",
                "Malformed CSV rows skipped during import"
            )
            .expect("Failed to register csv_rows_skipped_total"),

            latency_fallbacks: register_int_counter!(
                "spectra_latency_fallbacks_total",
                "Latency readings served from the regional baseline"
            )
            .expect("Failed to register latency_fallbacks_total"),

            latency_refresh_seconds: register_histogram!(
                "spectra_latency_refresh_seconds",
                "Time spent refreshing latency for all regions",
                REFRESH_BUCKETS.to_vec()
            )
            .expect("Failed to register latency_refresh_seconds"),

            background_job_failures: register_int_counter_vec!(
                "spectra_background_job_failures_total",
                "Failed runs of periodic background jobs",
                &["job"]
            )
            .expect("Failed to register background_job_failures_total"),
        }
    }
}

/// Handle to the global SPECTRA metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct SpectraMetrics {
    _private: (),
}

impl Default for SpectraMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectraMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SpectraMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SpectraMetricsInner {
        GLOBAL_METRICS.get_or_init(SpectraMetricsInner::new)
    }

    pub fn record_tick(&self, sim_now_unix: i64) {
        self.inner().clock_ticks.inc();
        self.inner().sim_time_seconds.set(sim_now_unix as f64);
    }

    pub fn set_sim_time(&self, sim_now_unix: i64) {
        self.inner().sim_time_seconds.set(sim_now_unix as f64);
    }

    pub fn record_migration(&self, moved: u32) {
        self.inner().migrations_executed.inc();
        self.inner().instances_moved.inc_by(moved as u64);
    }

    pub fn inc_rightsizing_applied(&self) {
        self.inner().rightsizing_applied.inc();
    }

    pub fn record_import(&self, imported: usize, skipped: usize) {
        self.inner().csv_rows_imported.inc_by(imported as u64);
        self.inner().csv_rows_skipped.inc_by(skipped as u64);
    }

    pub fn inc_latency_fallbacks(&self) {
        self.inner().latency_fallbacks.inc();
    }

    pub fn observe_latency_refresh(&self, duration_secs: f64) {
        self.inner().latency_refresh_seconds.observe(duration_secs);
    }

    pub fn inc_job_failure(&self, job: &str) {
        self.inner()
            .background_job_failures
            .with_label_values(&[job])
            .inc();
    }
}

/// Structured logger for domain events
#[derive(Clone)]
pub struct EventLogger {
    env: String,
}

impl EventLogger {
    pub fn new(env: impl Into<String>) -> Self {
        Self { env: env.into() }
    }

    pub fn log_startup(&self, version: &str, sim_now: &str) {
        info!(
            event = "service_started",
            env = %self.env,
            version = %version,
            sim_now = %sim_now,
            "SPECTRA API started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            env = %self.env,
            reason = %reason,
            "SPECTRA API shutting down"
        );
    }

    pub fn log_tick(&self, hours: i64, sim_now: &str) {
        info!(
            event = "sim_clock_ticked",
            env = %self.env,
            hours = hours,
            sim_now = %sim_now,
            "Simulation clock advanced"
        );
    }

    pub fn log_migration(&self, from: &str, to: &str, moved: u32, audited: bool) {
        info!(
            event = "migration_executed",
            env = %self.env,
            from_region = %from,
            to_region = %to,
            moved = moved,
            audited = audited,
            "Region migration executed"
        );
    }

    pub fn log_rightsizing(&self, instance_id: i64, from_type: &str, to_type: &str, co2e_saved: f64) {
        info!(
            event = "rightsizing_applied",
            env = %self.env,
            instance_id = instance_id,
            from_type = %from_type,
            to_type = %to_type,
            co2e_saved = co2e_saved,
            "Rightsizing recommendation applied"
        );
    }

    pub fn log_import(&self, file: &str, region: &str, imported: usize, skipped: usize) {
        info!(
            event = "csv_imported",
            env = %self.env,
            file = %file,
            region = %region,
            imported = imported,
            skipped = skipped,
            "Carbon-intensity CSV imported"
        );
    }

    pub fn log_latency_fallback(&self, region: &str, reason: &str) {
        warn!(
            event = "latency_fallback",
            env = %self.env,
            region = %region,
            reason = %reason,
            "Latency feed unavailable, using regional baseline"
        );
    }

    pub fn log_job_failure(&self, job: &str, error: &str) {
        warn!(
            event = "background_job_failed",
            env = %self.env,
            job = %job,
            error = %error,
            "Background job failed, next run proceeds on schedule"
        );
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new("development")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_can_be_recorded() {
        let metrics = SpectraMetrics::new();
        metrics.record_tick(1_704_067_200);
        metrics.record_migration(3);
        metrics.inc_rightsizing_applied();
        metrics.record_import(10, 2);
        metrics.inc_latency_fallbacks();
        metrics.observe_latency_refresh(0.02);
        metrics.inc_job_failure("sim_clock_tick");
    }

    #[test]
    fn test_event_logger_creation() {
        let logger = EventLogger::new("test");
        assert_eq!(logger.env, "test");
    }
}
