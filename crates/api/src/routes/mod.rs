//! Route groups, one module per resource

pub mod admin;
pub mod anomalies;
pub mod budgets;
pub mod dashboard;
pub mod instances;
pub mod migrations;
pub mod optimizer;
pub mod regions;
pub mod reports;
pub mod scheduler;
pub mod settings;
pub mod system;

use crate::AppState;
use std::sync::Arc;

pub type SharedState = Arc<AppState>;
