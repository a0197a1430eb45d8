//! Team carbon budgets and chargeback export
//!
//! Usage is a derived view: it is summed from running instances on every
//! read. The stored `used_snapshot` is written once and never read back.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{Result, SpectraError};
use crate::estimator::{round1, round2};
use crate::models::{InstanceFilter, TeamBudget};
use crate::store::SharedStore;

/// Quarter label of a date, e.g. `Q3-2025`
pub fn quarter_label(at: DateTime<Utc>) -> String {
    let quarter = (at.month() - 1) / 3 + 1;
    format!("Q{}-{}", quarter, at.year())
}

pub const CSV_HEADER: &str = "team,quarterYear,allocated_kg,used_kg,instances,pct_used";

/// Live usage of one team
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamUsage {
    pub used: f64,
    pub instances: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    pub id: i64,
    pub team: String,
    pub allocated: f64,
    pub used: f64,
    pub remaining: f64,
    pub instances: usize,
    pub quarter_year: String,
    pub pct_used: f64,
}

impl BudgetView {
    fn new(budget: TeamBudget, usage: TeamUsage) -> Self {
        let pct_used = if budget.allocated > 0.0 {
            round1(usage.used / budget.allocated * 100.0)
        } else {
            0.0
        };
        Self {
            id: budget.id,
            remaining: round2(budget.allocated - usage.used),
            team: budget.team,
            allocated: budget.allocated,
            used: usage.used,
            instances: usage.instances,
            quarter_year: budget.quarter_year,
            pct_used,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    pub team: String,
    pub allocated: f64,
    pub quarter_year: Option<String>,
}

/// Quarter-wide totals used by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetTotals {
    pub quarterly: f64,
    pub used: f64,
    pub remaining: f64,
}

fn check_allocated(allocated: f64) -> Result<()> {
    if !allocated.is_finite() || allocated < 0.0 {
        return Err(SpectraError::validation("allocated must be a non-negative number"));
    }
    Ok(())
}

#[derive(Clone)]
pub struct BudgetService {
    store: SharedStore,
}

impl BudgetService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// CO2e and instance count per team over running instances
    pub async fn team_usage(&self) -> Result<HashMap<String, TeamUsage>> {
        let mut usage: HashMap<String, TeamUsage> = HashMap::new();
        for instance in self.store.list_instances(&InstanceFilter::running()).await? {
            let entry = usage.entry(instance.team).or_default();
            entry.used = round2(entry.used + instance.co2e_per_month);
            entry.instances += 1;
        }
        Ok(usage)
    }

    /// Budgets of a quarter with live usage
    pub async fn list(&self, quarter: &str) -> Result<Vec<BudgetView>> {
        let usage = self.team_usage().await?;
        Ok(self
            .store
            .list_budgets(Some(quarter))
            .await?
            .into_iter()
            .map(|b| {
                let team_usage = usage.get(&b.team).copied().unwrap_or_default();
                BudgetView::new(b, team_usage)
            })
            .collect())
    }

    /// Create a budget; the quarter defaults to the one containing `now`
    pub async fn create(&self, new: NewBudget, now: DateTime<Utc>) -> Result<TeamBudget> {
        if new.team.trim().is_empty() {
            return Err(SpectraError::validation("team is required"));
        }
        check_allocated(new.allocated)?;
        let quarter = new.quarter_year.unwrap_or_else(|| quarter_label(now));

        if self.store.find_budget(&new.team, &quarter).await?.is_some() {
            return Err(SpectraError::Conflict(format!(
                "Budget for {} in {} already exists",
                new.team, quarter
            )));
        }

        let used_snapshot = self
            .team_usage()
            .await?
            .get(&new.team)
            .map_or(0.0, |u| u.used);
        self.store
            .insert_budget(TeamBudget {
                id: 0,
                team: new.team,
                quarter_year: quarter,
                allocated: new.allocated,
                used_snapshot,
            })
            .await
    }

    /// Change a team's allocation for a quarter
    pub async fn update(&self, team: &str, allocated: f64, quarter: &str) -> Result<TeamBudget> {
        check_allocated(allocated)?;
        let mut budget = self
            .store
            .find_budget(team, quarter)
            .await?
            .ok_or_else(|| {
                SpectraError::not_found(format!("No budget found for team '{team}' in {quarter}"))
            })?;
        budget.allocated = allocated;
        self.store.update_budget(&budget).await?;
        Ok(budget)
    }

    /// Chargeback CSV for a quarter with live usage
    pub async fn export_csv(&self, quarter: &str) -> Result<String> {
        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for view in self.list(quarter).await? {
            // Writing to a String cannot fail
            let _ = writeln!(
                out,
                "{},{},{},{},{},{}",
                csv_field(&view.team),
                csv_field(&view.quarter_year),
                view.allocated,
                view.used,
                view.instances,
                view.pct_used
            );
        }
        Ok(out)
    }

    /// Allocation over all budgets against live usage of all running instances
    pub async fn totals(&self) -> Result<BudgetTotals> {
        let quarterly = round2(
            self.store
                .list_budgets(None)
                .await?
                .iter()
                .map(|b| b.allocated)
                .sum(),
        );
        let used = round2(self.team_usage().await?.values().map(|u| u.used).sum());
        Ok(BudgetTotals {
            quarterly,
            used,
            remaining: round2((quarterly - used).max(0.0)),
        })
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
