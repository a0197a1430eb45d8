//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use spectra_lib::clock::DEFAULT_SIM_START;
use spectra_lib::latency::DEFAULT_RADAR_ENDPOINT;

/// Configuration read from `SPECTRA_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Initial simulated time, RFC 3339
    #[serde(default = "default_sim_start")]
    pub sim_start: String,

    /// Wall-clock hours between automatic clock ticks
    #[serde(default = "default_tick_interval")]
    pub sim_tick_interval_hours: u64,

    /// Wall-clock hours between latency refreshes
    #[serde(default = "default_latency_interval")]
    pub latency_fetch_interval_hours: u64,

    /// Directory of carbon-intensity CSV snapshots
    #[serde(default = "default_csv_dir")]
    pub csv_dir: String,

    /// Radar API token; latency falls back to baselines when empty
    #[serde(default)]
    pub radar_api_token: String,

    #[serde(default = "default_radar_endpoint")]
    pub radar_endpoint: String,

    /// Comma-separated allowed origins; empty or `*` allows any
    #[serde(default)]
    pub cors_origins: String,

    #[serde(default = "default_seed_on_startup")]
    pub seed_on_startup: bool,

    #[serde(default = "default_app_env")]
    pub app_env: String,
}

fn default_api_port() -> u16 {
    8000
}

fn default_sim_start() -> String {
    DEFAULT_SIM_START.to_string()
}

fn default_tick_interval() -> u64 {
    1
}

fn default_latency_interval() -> u64 {
    6
}

fn default_csv_dir() -> String {
    "./data/electricitymaps".to_string()
}

fn default_radar_endpoint() -> String {
    DEFAULT_RADAR_ENDPOINT.to_string()
}

fn default_seed_on_startup() -> bool {
    true
}

fn default_app_env() -> String {
    "development".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            sim_start: default_sim_start(),
            sim_tick_interval_hours: default_tick_interval(),
            latency_fetch_interval_hours: default_latency_interval(),
            csv_dir: default_csv_dir(),
            radar_api_token: String::new(),
            radar_endpoint: default_radar_endpoint(),
            cors_origins: String::new(),
            seed_on_startup: default_seed_on_startup(),
            app_env: default_app_env(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SPECTRA").try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("invalid SPECTRA_* configuration")
    }

    pub fn radar_token(&self) -> Option<String> {
        let token = self.radar_api_token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect()
    }
}
