// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workflow run command
//!
//! Builds the gateway and collector from configuration, runs every phase and
//! prints the final state. A failed run still prints the state accumulated so
//! far, then exits non-zero.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use claim_swarm_core::domain::evidence::EvidenceCollector;
use claim_swarm_core::domain::swarm_config::SwarmConfigManifest;
use claim_swarm_core::infrastructure::llm::build_gateway;
use claim_swarm_core::infrastructure::{NoopCollector, UrlEvidenceCollector};
use claim_swarm_engine::{ClaimId, SwarmDriver, SwarmState};

#[derive(Args)]
pub struct RunArgs {
    /// Identifier of the purchased item in the catalog
    #[arg(long)]
    pub target_id: u64,

    /// Display title of the item
    #[arg(long, value_parser = non_empty)]
    pub title: String,

    /// Jurisdiction code, e.g. UK or DE
    #[arg(long, value_parser = non_empty)]
    pub jurisdiction: String,

    /// Run identifier (default: random UUID)
    #[arg(long)]
    pub claim_id: Option<String>,

    /// Extra page to capture as evidence (repeatable)
    #[arg(long = "source-url", value_name = "URL")]
    pub source_urls: Vec<String>,

    /// Also write the final state to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

fn non_empty(value: &str) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err("value cannot be empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

pub async fn execute(args: RunArgs, mut config: SwarmConfigManifest) -> Result<()> {
    config.spec.collection.seed_urls.extend(args.source_urls);
    config
        .validate()
        .context("Configuration validation failed")?;

    let gateway = build_gateway(&config.spec.inference).context("Failed to build inference gateway")?;

    let collection = &config.spec.collection;
    let collector: Arc<dyn EvidenceCollector> = if collection.seed_urls.is_empty() {
        Arc::new(NoopCollector)
    } else {
        Arc::new(
            UrlEvidenceCollector::from_config(collection)
                .context("Failed to build evidence collector")?,
        )
    };

    let claim_id = args.claim_id.map(ClaimId::new).unwrap_or_else(ClaimId::generate);
    info!(claim_id = %claim_id, "Starting claim run");

    let state = SwarmState::new(claim_id, args.target_id, args.title, args.jurisdiction);
    let driver = SwarmDriver::new(gateway, collector);

    match driver.run(state).await {
        Ok(state) => {
            emit_state(&state, args.output.as_ref())?;
            eprintln!(
                "{}",
                format!(
                    "✓ Claim {} completed ({} phases)",
                    state.claim_id(),
                    state.progress_log().len()
                )
                .green()
            );
            Ok(())
        }
        Err(failure) => {
            emit_state(&failure.state, args.output.as_ref())?;
            eprintln!("{} {}", "✗".red(), failure);
            if let Some(source) = std::error::Error::source(&failure.error) {
                eprintln!("  {} {}", "caused by:".dimmed(), source);
            }
            std::process::exit(1);
        }
    }
}

fn emit_state(state: &SwarmState, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
    println!("{}", json);

    if let Some(path) = output {
        std::fs::write(path, &json).with_context(|| format!("Failed to write state to {:?}", path))?;
        info!("State written to {}", path.display());
    }

    Ok(())
}
