// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use claim_swarm_core::domain::swarm_config::{
    BackendKind, LoggingConfig, ObservabilityConfig, SwarmConfigManifest,
};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./claim-swarm.yaml)
        #[arg(short, long, default_value = "./claim-swarm.yaml")]
        output: PathBuf,

        /// Inference backend (direct-key, express-key, delegated-auth)
        #[arg(long, default_value = "direct-key")]
        backend: String,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, backend } => generate(&output, &backend).await,
    }
}

fn redact(value: Option<&str>) -> String {
    match value {
        Some(v) if v.starts_with("env:") => v.to_string(),
        Some(_) => "<redacted>".to_string(),
        None => "(not set)".to_string(),
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = SwarmConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        for (i, path) in SwarmConfigManifest::discovery_paths().iter().enumerate() {
            println!("  {}. {}", i + 2, path);
        }
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let inference = &config.spec.inference;
    println!("{}", "Inference:".bold());
    println!("  Backend: {}", inference.backend);
    println!("  Model: {}", inference.model);
    match inference.backend {
        BackendKind::DirectKey | BackendKind::ExpressKey => {
            println!("  API key: {}", redact(inference.api_key.as_deref()));
        }
        BackendKind::DelegatedAuth => {
            println!("  Project: {}", inference.project.as_deref().unwrap_or("(not set)"));
            println!("  Location: {}", inference.location.as_deref().unwrap_or("(not set)"));
            match &inference.credentials_file {
                Some(path) => println!("  Credentials file: {}", path.display()),
                None => println!("  Access token: {}", redact(inference.access_token.as_deref())),
            }
        }
    }
    if let Some(endpoint) = &inference.endpoint {
        println!("  Endpoint override: {}", endpoint);
    }
    println!("  Temperature: {}", inference.temperature);
    println!("  Timeout: {}s", inference.timeout_seconds);
    println!("  Attempts: {}", inference.retry.max_attempts);
    println!();

    let collection = &config.spec.collection;
    println!("{}", "Evidence Collection:".bold());
    if collection.seed_urls.is_empty() {
        println!("  Seed URLs: {}", "(none)".dimmed());
    } else {
        println!("  Seed URLs:");
        for url in &collection.seed_urls {
            println!("    - {}", url);
        }
    }
    println!("  Max concurrency: {}", collection.max_concurrency);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = SwarmConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

/// Sample manifest for `backend`, ready to be loaded back.
fn sample_manifest(backend: BackendKind) -> SwarmConfigManifest {
    let mut manifest = SwarmConfigManifest::default();
    manifest.metadata.name = "local".to_string();

    let inference = &mut manifest.spec.inference;
    inference.backend = backend;
    match backend {
        BackendKind::DirectKey | BackendKind::ExpressKey => {
            inference.api_key = Some("env:GEMINI_API_KEY".to_string());
        }
        BackendKind::DelegatedAuth => {
            inference.project = Some("my-project".to_string());
            inference.location = Some("us-central1".to_string());
            inference.credentials_file = Some(PathBuf::from("./service-account.json"));
        }
    }

    manifest.spec.observability = Some(ObservabilityConfig {
        logging: Some(LoggingConfig {
            level: "info".to_string(),
            format: "text".to_string(),
        }),
    });

    manifest
}

async fn generate(output: &Path, backend: &str) -> Result<()> {
    let backend: BackendKind = backend.parse()?;

    sample_manifest(backend)
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
