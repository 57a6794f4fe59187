//! Surf conditions CLI
//!
//! A command-line tool for listing spots, reading conditions reports
//! and outlooks, and rescoring spots with personal factor emphasis.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{conditions, feedback};

/// Surf conditions CLI
#[derive(Parser)]
#[command(name = "surf")]
#[command(author, version, about = "CLI for the surf conditions agent", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SURF_API_URL env var)
    #[arg(long, env = "SURF_API_URL")]
    pub api_url: Option<String>,

    /// Output format (defaults to the config file, then table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured spots
    Spots,

    /// Show current conditions, score and outlook for a spot
    Report {
        /// Spot ID
        spot: String,

        /// Evaluate the outlook as of this RFC 3339 instant
        #[arg(long)]
        at: Option<String>,
    },

    /// Show the outlook for the rest of today and tomorrow
    Trend {
        /// Spot ID
        spot: String,

        /// Evaluate the outlook as of this RFC 3339 instant
        #[arg(long)]
        at: Option<String>,
    },

    /// Rescore a spot with per-factor multipliers
    Reweight {
        /// Spot ID
        spot: String,

        /// Factor multiplier as FACTOR=MULTIPLIER (repeatable, clamped to 0-3)
        #[arg(long = "weight", short = 'w', value_parser = feedback::parse_weight)]
        weights: Vec<(String, f64)>,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);
    let format = config.resolve_format(cli.format)?;

    if cli.verbose {
        output::print_info(&format!("Using agent at {}", api_url));
    }

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Spots => {
            conditions::list_spots(&client, format).await?;
        }
        Commands::Report { spot, at } => {
            conditions::show_report(&client, &spot, at, format).await?;
        }
        Commands::Trend { spot, at } => {
            conditions::show_trend(&client, &spot, at, format).await?;
        }
        Commands::Reweight { spot, weights } => {
            feedback::reweight(&client, &spot, weights, format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
