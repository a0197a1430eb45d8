//! Simulated clock
//!
//! The simulated "now" decides which carbon-intensity row is live. It is
//! persisted through the store, initialized lazily from a configured start and
//! only ever moves forward in whole hours.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{Result, SpectraError};
use crate::store::SharedStore;

/// Start used when none is configured
pub const DEFAULT_SIM_START: &str = "2024-01-01T00:00:00Z";

/// Parse an RFC 3339 start timestamp (a trailing `Z` is accepted)
pub fn parse_start(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SpectraError::validation(format!("Invalid simulation start '{value}': {e}")))
}

fn out_of_range(value: i64, unit: &str) -> SpectraError {
    SpectraError::validation(format!("{unit} value {value} is out of range"))
}

/// `at + hours`, or a validation error when the result leaves chrono's range
pub fn add_hours(at: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_hours(hours)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| out_of_range(hours, "hours"))
}

/// `at - hours`, or a validation error when the result leaves chrono's range
pub fn sub_hours(at: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_hours(hours)
        .and_then(|delta| at.checked_sub_signed(delta))
        .ok_or_else(|| out_of_range(hours, "hours"))
}

/// `at - days`, or a validation error when the result leaves chrono's range
pub fn sub_days(at: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_days(days)
        .and_then(|delta| at.checked_sub_signed(delta))
        .ok_or_else(|| out_of_range(days, "days"))
}

/// Injected simulation clock service
#[derive(Clone)]
pub struct SimClock {
    store: SharedStore,
    start: DateTime<Utc>,
}

impl SimClock {
    pub fn new(store: SharedStore, start: DateTime<Utc>) -> Self {
        Self { store, start }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Current simulated time, initializing it from the start on first read
    pub async fn now(&self) -> Result<DateTime<Utc>> {
        match self.store.sim_now().await? {
            Some(now) => Ok(now),
            None => {
                self.store.set_sim_now(self.start).await?;
                Ok(self.start)
            }
        }
    }

    /// Advance the clock by `hours`
    ///
    /// An uninitialized clock is initialized to the start and the delta is
    /// not applied.
    pub async fn tick(&self, hours: i64) -> Result<DateTime<Utc>> {
        if hours < 1 {
            return Err(SpectraError::validation(format!(
                "hours must be at least 1, got {hours}"
            )));
        }

        let Some(current) = self.store.sim_now().await? else {
            return self.now().await;
        };

        let next = add_hours(current, hours)?;
        self.store.set_sim_now(next).await?;
        Ok(next)
    }
}
