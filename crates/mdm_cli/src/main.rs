//! MDM CLI
//!
//! Command-line tools for the MDM server.
//!
//! # Commands
//!
//! - `serve` - Run the MDM server
//! - `device` - Run a simulated device agent
//! - `list`, `info`, `status`, `features` - Query the registry
//! - `info-list`, `status-list`, `features-list` - Query every device
//! - `set-feature` - Change one feature of one device

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::query::Query;
use mdm_agent::DEFAULT_SERVER_ADDR;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// MDM server, device agent and operator tools.
#[derive(Parser)]
#[command(name = "mdm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON config file
    #[arg(global = true, short, long, env = "MDM_CONFIG")]
    config: Option<PathBuf>,

    /// Server address for operator commands
    #[arg(global = true, short, long, default_value = DEFAULT_SERVER_ADDR)]
    server: String,

    /// Output format (text, json)
    #[arg(global = true, short, long, value_enum, default_value = "text")]
    format: Format,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MDM server
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// SQLite database file (in-memory if omitted)
        #[arg(short, long)]
        db: Option<PathBuf>,
    },

    /// Run a simulated device agent
    Device {
        /// Device UUID (required without a config file)
        #[arg(long)]
        id: Option<String>,

        /// Device type: 0 Android, 1 iOS, 2 Windows
        #[arg(long = "type")]
        device_type: Option<i32>,

        /// Location reported in pings
        #[arg(long)]
        location: Option<String>,

        /// Battery level reported in pings
        #[arg(long)]
        battery: Option<i32>,

        /// Seconds between pings
        #[arg(long)]
        interval: Option<u64>,
    },

    /// List device ids
    List,

    /// Show a device's type
    Info {
        /// Device UUID
        device_id: String,
    },

    /// Show a device's last status
    Status {
        /// Device UUID
        device_id: String,
    },

    /// Show a device's feature configuration
    Features {
        /// Device UUID
        device_id: String,
    },

    /// Show the type of every device
    InfoList,

    /// Show the last status of every device
    StatusList,

    /// Show the feature configuration of every device
    FeaturesList,

    /// Enable or disable a feature on a device
    SetFeature {
        /// Device UUID
        device_id: String,

        /// Feature name
        feature: String,

        /// New state (true, false)
        #[arg(action = clap::ArgAction::Set)]
        state: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.config;

    let query = match cli.command {
        Commands::Serve { bind, db } => {
            return commands::serve::run(config.as_deref(), bind, db).await;
        }
        Commands::Device {
            id,
            device_type,
            location,
            battery,
            interval,
        } => {
            let overrides = commands::device::Overrides {
                id,
                device_type,
                location,
                battery,
                interval,
                server: cli.server,
            };
            return commands::device::run(config.as_deref(), overrides).await;
        }
        Commands::List => Query::List,
        Commands::Info { device_id } => Query::Info(device_id),
        Commands::Status { device_id } => Query::Status(device_id),
        Commands::Features { device_id } => Query::Features(device_id),
        Commands::InfoList => Query::InfoList,
        Commands::StatusList => Query::StatusList,
        Commands::FeaturesList => Query::FeaturesList,
        Commands::SetFeature {
            device_id,
            feature,
            state,
        } => Query::SetFeature {
            device_id,
            feature,
            state,
        },
    };

    commands::query::run(&cli.server, cli.format, query).await
}
