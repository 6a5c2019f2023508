// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Workflow Driver
//!
//! Runs the phases strictly in [`PhaseKind::ALL`] order, threading one
//! [`SwarmState`] through them. There is no branching, no skipping and no
//! driver-level retry: the first failure ends the run and the caller gets the
//! state as of the last phase that succeeded.

use crate::application::phases::{default_phases, Phase, PhaseContext, PhaseError};
use crate::domain::phase::PhaseKind;
use crate::domain::swarm::SwarmState;
use claim_swarm_core::domain::evidence::EvidenceCollector;
use claim_swarm_core::domain::llm::InferenceGateway;
use claim_swarm_core::infrastructure::NoopCollector;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// A run that stopped early.
#[derive(Debug, Error)]
#[error("Phase {phase} failed: {error}")]
pub struct SwarmRunFailure {
    pub phase: PhaseKind,
    #[source]
    pub error: PhaseError,
    /// State accumulated through the last successful phase
    pub state: SwarmState,
}

pub struct SwarmDriver {
    gateway: Arc<dyn InferenceGateway>,
    collector: Arc<dyn EvidenceCollector>,
    phases: Vec<Box<dyn Phase>>,
}

impl SwarmDriver {
    pub fn new(gateway: Arc<dyn InferenceGateway>, collector: Arc<dyn EvidenceCollector>) -> Self {
        Self {
            gateway,
            collector,
            phases: default_phases(),
        }
    }

    /// Driver with no evidence collection tools configured
    pub fn with_gateway(gateway: Arc<dyn InferenceGateway>) -> Self {
        Self::new(gateway, Arc::new(NoopCollector))
    }

    pub fn phases(&self) -> impl Iterator<Item = PhaseKind> + '_ {
        self.phases.iter().map(|p| p.kind())
    }

    fn context(&self) -> PhaseContext<'_> {
        PhaseContext {
            gateway: self.gateway.as_ref(),
            collector: self.collector.as_ref(),
        }
    }

    /// Execute a single phase and fold its update into `state`.
    ///
    /// On error `state` is left unchanged.
    pub async fn run_phase(&self, phase: &dyn Phase, state: &mut SwarmState) -> Result<(), PhaseError> {
        let update = phase.execute(state, &self.context()).await?;
        state.apply(update)?;
        Ok(())
    }

    /// Run every phase in order.
    pub async fn run(&self, mut state: SwarmState) -> Result<SwarmState, Box<SwarmRunFailure>> {
        info!(
            claim_id = %state.claim_id(),
            target_id = state.target_id(),
            jurisdiction = %state.jurisdiction(),
            gateway = %self.gateway.describe(),
            "Starting swarm run"
        );
        let started = Instant::now();

        for phase in &self.phases {
            let kind = phase.kind();
            let phase_started = Instant::now();
            info!(claim_id = %state.claim_id(), phase = %kind, "Phase started");

            if let Err(e) = self.run_phase(phase.as_ref(), &mut state).await {
                metrics::counter!("claim_swarm_phase_failed_total", "phase" => kind.as_str()).increment(1);
                error!(
                    claim_id = %state.claim_id(),
                    phase = %kind,
                    error = %e,
                    "Phase failed, aborting run"
                );
                return Err(Box::new(SwarmRunFailure {
                    phase: kind,
                    error: e,
                    state,
                }));
            }

            metrics::counter!("claim_swarm_phase_completed_total", "phase" => kind.as_str()).increment(1);
            info!(
                claim_id = %state.claim_id(),
                phase = %kind,
                elapsed_ms = phase_started.elapsed().as_millis() as u64,
                "Phase completed"
            );
        }

        info!(
            claim_id = %state.claim_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Swarm run completed"
        );
        Ok(state)
    }
}
