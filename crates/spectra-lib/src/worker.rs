//! Periodic background jobs
//!
//! One task drives two independent timers: the simulation clock tick and the
//! latency refresh. A failed run is logged, counted and reported to health;
//! the next run goes ahead as scheduled.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::clock::SimClock;
use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::latency::{LatencyService, RefreshSummary};
use crate::observability::{EventLogger, SpectraMetrics};

pub const JOB_SIM_TICK: &str = "sim_tick";
pub const JOB_LATENCY_REFRESH: &str = "latency_refresh";

const SECS_PER_HOUR: u64 = 3600;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub tick_interval: Duration,
    /// Simulated hours added per tick
    pub tick_hours: i64,
    pub latency_interval: Duration,
}

impl WorkerConfig {
    /// Both jobs run on wall-clock hour intervals; each tick adds one sim hour
    pub fn from_hours(tick_interval_hours: u64, latency_interval_hours: u64) -> Self {
        Self {
            tick_interval: Duration::from_secs(tick_interval_hours.max(1) * SECS_PER_HOUR),
            tick_hours: 1,
            latency_interval: Duration::from_secs(latency_interval_hours.max(1) * SECS_PER_HOUR),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from_hours(1, 6)
    }
}

#[derive(Clone)]
pub struct BackgroundWorker {
    clock: SimClock,
    latency: LatencyService,
    health: HealthRegistry,
    logger: EventLogger,
    metrics: SpectraMetrics,
    config: WorkerConfig,
}

impl BackgroundWorker {
    pub fn new(
        clock: SimClock,
        latency: LatencyService,
        health: HealthRegistry,
        logger: EventLogger,
        config: WorkerConfig,
    ) -> Self {
        Self {
            clock,
            latency,
            health,
            logger,
            metrics: SpectraMetrics::new(),
            config,
        }
    }

    /// Advance the sim clock, recording the outcome
    ///
    /// Also used by the admin trigger, so a manual tick is observed the same
    /// way as a scheduled one.
    pub async fn tick_clock(&self, hours: i64) -> Result<DateTime<Utc>> {
        let outcome = self.clock.tick(hours).await;
        match &outcome {
            Ok(sim_now) => {
                self.metrics.record_tick(sim_now.timestamp());
                self.logger.log_tick(hours, &sim_now.to_rfc3339());
                self.health.set_healthy(components::SIM_CLOCK).await;
            }
            // A rejected request says nothing about the clock itself
            Err(e) if e.is_client_error() => {}
            Err(e) => {
                self.job_failed(JOB_SIM_TICK, &e.to_string());
                self.health
                    .set_degraded(components::SIM_CLOCK, e.to_string())
                    .await;
            }
        }
        outcome
    }

    /// Append one latency reading per enabled region, recording the outcome
    pub async fn refresh_latency(&self) -> Result<RefreshSummary> {
        let outcome = self.latency.refresh(Utc::now()).await;
        match &outcome {
            Ok(summary) if summary.fallbacks > 0 => {
                self.health
                    .set_degraded(
                        components::LATENCY_FEED,
                        format!(
                            "{} of {} regions on baseline latency",
                            summary.fallbacks, summary.regions
                        ),
                    )
                    .await;
            }
            Ok(_) => self.health.set_healthy(components::LATENCY_FEED).await,
            Err(e) => {
                self.job_failed(JOB_LATENCY_REFRESH, &e.to_string());
                self.health
                    .set_degraded(components::LATENCY_FEED, e.to_string())
                    .await;
            }
        }
        outcome
    }

    fn job_failed(&self, job: &str, error: &str) {
        self.metrics.inc_job_failure(job);
        self.logger.log_job_failure(job, error);
    }

    /// Run both jobs until a shutdown signal arrives
    ///
    /// The first run of each job happens one interval after start. Missed
    /// ticks are skipped rather than replayed.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            tick_interval_secs = self.config.tick_interval.as_secs(),
            latency_interval_secs = self.config.latency_interval.as_secs(),
            "Starting background worker"
        );

        let start = Instant::now();
        let mut tick_timer =
            interval_at(start + self.config.tick_interval, self.config.tick_interval);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut latency_timer = interval_at(
            start + self.config.latency_interval,
            self.config.latency_interval,
        );
        latency_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_timer.tick() => {
                    // Failures are already logged and counted
                    let _ = self.tick_clock(self.config.tick_hours).await;
                }
                _ = latency_timer.tick() => {
                    let _ = self.refresh_latency().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down background worker");
                    break;
                }
            }
        }
    }
}
