pub mod admin;
pub mod budgets;
pub mod dashboard;
pub mod instances;
pub mod jobs;
pub mod migrations;
pub mod regions;
