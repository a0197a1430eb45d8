//! Core library for the SPECTRA sustainability backend
//!
//! This crate provides the core functionality for:
//! - Carbon and cost estimation for cloud instances
//! - Risk classification and rightsizing recommendations
//! - A simulated clock gating the "live" carbon-intensity hour
//! - Region ranking, migration planning and carbon-aware job scheduling
//! - Budgets, anomalies, settings, reports and CSV import
//! - Health checks and observability

pub mod anomalies;
pub mod budgets;
pub mod catalog;
pub mod classifier;
pub mod clock;
pub mod error;
pub mod estimator;
pub mod health;
pub mod ingest;
pub mod instances;
pub mod intensity;
pub mod latency;
pub mod models;
pub mod observability;
pub mod optimizer;
pub mod reports;
pub mod scheduler;
pub mod seed;
pub mod settings;
pub mod store;
pub mod worker;

pub use catalog::{Catalog, PowerModel};
pub use clock::SimClock;
pub use error::{Result, SpectraError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EventLogger, SpectraMetrics};
pub use store::{MemoryStore, SharedStore, Store};
