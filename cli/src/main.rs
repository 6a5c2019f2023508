// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Claim Swarm CLI
//!
//! The `claim-swarm` binary runs one evidence-to-filing workflow against the
//! configured inference backend and prints the resulting state as JSON.
//!
//! ## Commands
//!
//! - `claim-swarm run --target-id ID --title TITLE --jurisdiction CODE` - Run the workflow
//! - `claim-swarm config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use claim_swarm_core::domain::swarm_config::{LoggingConfig, SwarmConfigManifest};

mod commands;

use commands::{ConfigCommand, RunArgs};

/// Claim Swarm - Turn public marketing evidence into a consumer claim
#[derive(Parser)]
#[command(name = "claim-swarm")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CLAIM_SWARM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, env = "CLAIM_SWARM_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the evidence-to-filing workflow for one item
    #[command(name = "run")]
    Run(RunArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let configured = file_logging(cli.config.clone());
    let (level, format) = resolve_logging(
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
        configured.as_ref(),
    );
    init_logging(&level, &format)?;

    let config = SwarmConfigManifest::load_or_default(cli.config.clone());

    match cli.command {
        Some(Commands::Run(args)) => {
            let config = config.context("Failed to load configuration")?;
            commands::run::execute(args, config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Logging section of the config file, read without emitting any events.
///
/// Unreadable or invalid files yield `None`; `load_or_default` reports them
/// once the subscriber is installed.
fn file_logging(cli_path: Option<PathBuf>) -> Option<LoggingConfig> {
    let path = cli_path.or_else(SwarmConfigManifest::discover_config)?;
    SwarmConfigManifest::from_yaml_file(path)
        .ok()?
        .spec
        .observability?
        .logging
}

/// Level and format: `--log-level`/`--log-format` (or their env vars) win
/// over the config file.
fn resolve_logging(
    level: Option<&str>,
    format: Option<&str>,
    configured: Option<&LoggingConfig>,
) -> (String, String) {
    let level = level
        .or(configured.map(|l| l.level.as_str()))
        .unwrap_or("info");
    let format = format
        .or(configured.map(|l| l.format.as_str()))
        .unwrap_or("text");
    (level.to_string(), format.to_string())
}

/// Initialize tracing subscriber for logging
///
/// `RUST_LOG` wins over the resolved level.
/// Logs go to stderr; stdout carries the state JSON.
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}
