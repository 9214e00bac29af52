mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bcprop")]
#[command(about = "BC property snapshot lookups")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a full property snapshot for a point or an address
    Lookup {
        /// Latitude in decimal degrees (WGS84)
        #[arg(long, allow_negative_numbers = true, conflicts_with = "address")]
        lat: Option<f64>,
        /// Longitude in decimal degrees (WGS84)
        #[arg(long, allow_negative_numbers = true, conflicts_with = "address")]
        lon: Option<f64>,
        /// Municipality name used to pick a zoning source
        #[arg(long)]
        municipality: Option<String>,
        /// Free-text street address to geocode
        #[arg(long)]
        address: Option<String>,
    },
    /// Resolve zoning only, printing every query attempt
    Zoning {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        municipality: Option<String>,
    },
    /// Official Community Plan designation (burnaby, surrey, vancouver)
    Ocp {
        #[arg(long)]
        city: String,
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
    },
    /// List the configured municipal zoning sources
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = bcprop_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli.command, &config).await
}
