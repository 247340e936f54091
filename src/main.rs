//! mcs_tool - host-side channel utility for the MCS debug module
//!
//! Main entry point: parses the command line, loads config, sets up logging,
//! and dispatches to the command handlers.

mod cli;
mod commands;
mod config;

use std::fs::File;
use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use cli::{Cli, Commands};
use commands::{stream, Target};
use config::McsToolConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr, so recv output on stdout stays clean)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    // Load config
    let config_path = cli.config.clone().unwrap_or_else(McsToolConfig::default_path);
    debug!("Loading config from {:?}", config_path);
    let config = McsToolConfig::load(&config_path)
        .with_context(|| format!("invalid config file {}", config_path.display()))?;

    let client = commands::open_client(&cli, &config)?;

    match &cli.command {
        Commands::Info { target, json } => {
            let target = Target::resolve(target, &config);
            let summary = stream::info(&client, &target)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary.to_text());
            }
        }
        Commands::Send { target, file } => {
            let target = Target::resolve(target, &config);
            let sent = match file {
                Some(path) => {
                    let input = File::open(path)
                        .with_context(|| format!("cannot read {}", path.display()))?;
                    stream::send(&client, &target, input)?
                }
                None => stream::send(&client, &target, io::stdin().lock())?,
            };
            eprintln!("Sent {} bytes to channel 0x{:04X}", sent, target.channel);
        }
        Commands::Recv {
            target,
            count,
            hex,
            drain,
        } => {
            let target = Target::resolve(target, &config);
            let options = stream::RecvOptions {
                count: *count,
                chunk_size: config.chunk_size,
                hex: *hex,
                drain: *drain,
            };
            stream::recv(&client, &target, io::stdout().lock(), &options)?;
        }
    }

    Ok(())
}
