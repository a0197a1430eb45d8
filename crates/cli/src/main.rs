//! SPECTRA CLI
//!
//! A command-line client for the SPECTRA sustainability dashboard API:
//! inspect the fleet, move workloads to greener regions and drive the
//! simulated clock.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{admin, budgets, dashboard, instances, jobs, migrations, regions};

/// SPECTRA CLI
#[derive(Parser)]
#[command(name = "spectra")]
#[command(author, version, about = "CLI for the SPECTRA sustainability dashboard", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SPECTRA_API_URL env var)
    #[arg(long, env = "SPECTRA_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List instances and apply rightsizing
    #[command(subcommand)]
    Instances(InstanceCommands),

    /// Grid intensity, latency and region ranking
    #[command(subcommand)]
    Regions(RegionCommands),

    /// Move all running instances from one region to another
    Migrate {
        /// Source region code
        #[arg(long)]
        from: String,

        /// Target region code
        #[arg(long)]
        to: String,
    },

    /// Show the migration audit log
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Scheduled jobs and the intensity forecast
    #[command(subcommand)]
    Jobs(JobCommands),

    /// Team carbon budgets
    #[command(subcommand)]
    Budgets(BudgetCommands),

    /// Headline dashboard figures
    Dashboard,

    /// Operator triggers
    #[command(subcommand)]
    Admin(AdminCommands),
}

#[derive(Subcommand)]
pub enum InstanceCommands {
    /// List instances
    List {
        /// Filter by region code
        #[arg(long, short)]
        region: Option<String>,

        /// Filter by risk tier (low, medium, high)
        #[arg(long)]
        risk: Option<String>,

        /// Match on name or instance type
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Apply the pending rightsizing recommendation
    Optimize {
        /// Instance ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RegionCommands {
    /// Current carbon intensity per region
    Signals,

    /// Latest latency per region
    Latency,

    /// Regions ranked with placement recommendations
    Ranking,
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// List scheduled jobs
    List,

    /// Accept the recommended schedule for a job
    Accept {
        /// Job ID
        id: i64,
    },

    /// 24-hour intensity forecast
    Forecast {
        /// Region code (greenest region when omitted)
        #[arg(long, short)]
        region: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Show budgets with live usage
    List {
        /// Quarter label, e.g. Q1-2026 (current quarter by default)
        #[arg(long, short)]
        quarter: Option<String>,
    },

    /// Export the chargeback CSV
    Export {
        #[arg(long, short)]
        quarter: Option<String>,

        /// Output file path (stdout if not specified)
        #[arg(long, short)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Import CSV snapshots and seed empty tables
    Import,

    /// Advance the simulated clock
    Tick {
        #[arg(long, default_value_t = 1)]
        hours: u32,
    },

    /// Refresh latency readings now
    FetchLatency,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let api_url = config::Config::load()?.resolve_api_url(cli.api_url);
    let client = client::ApiClient::new(&api_url)?;
    let format = cli.format;

    match cli.command {
        Commands::Instances(cmd) => match cmd {
            InstanceCommands::List {
                region,
                risk,
                search,
            } => instances::list_instances(&client, region, risk, search, format).await?,
            InstanceCommands::Optimize { id } => {
                instances::optimize_instance(&client, id, format).await?
            }
        },
        Commands::Regions(cmd) => match cmd {
            RegionCommands::Signals => regions::show_signals(&client, format).await?,
            RegionCommands::Latency => regions::show_latency(&client, format).await?,
            RegionCommands::Ranking => regions::show_ranking(&client, format).await?,
        },
        Commands::Migrate { from, to } => migrations::execute(&client, &from, &to, format).await?,
        Commands::History { limit, offset } => {
            migrations::history(&client, limit, offset, format).await?
        }
        Commands::Jobs(cmd) => match cmd {
            JobCommands::List => jobs::list_jobs(&client, format).await?,
            JobCommands::Accept { id } => jobs::accept_job(&client, id, format).await?,
            JobCommands::Forecast { region } => jobs::show_forecast(&client, region, format).await?,
        },
        Commands::Budgets(cmd) => match cmd {
            BudgetCommands::List { quarter } => budgets::list_budgets(&client, quarter, format).await?,
            BudgetCommands::Export { quarter, output } => {
                budgets::export_budgets(&client, quarter, output).await?
            }
        },
        Commands::Dashboard => dashboard::show_dashboard(&client, format).await?,
        Commands::Admin(cmd) => match cmd {
            AdminCommands::Import => admin::import(&client, format).await?,
            AdminCommands::Tick { hours } => admin::tick(&client, hours, format).await?,
            AdminCommands::FetchLatency => admin::fetch_latency(&client, format).await?,
        },
    }

    Ok(())
}
