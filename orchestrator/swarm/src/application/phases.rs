// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Phase Executors
//!
//! One [`Phase`] implementation per step of the run. A phase never mutates the
//! state it is given; it returns a [`StateUpdate`] that the driver folds in
//! with [`SwarmState::apply`], so a failed phase leaves no trace.

use crate::domain::contract::{self, ContractError};
use crate::domain::phase::PhaseKind;
use crate::domain::swarm::{
    EvidenceSource, LegalFinding, PromiseFinding, StateError, StateUpdate, SwarmState,
};
use async_trait::async_trait;
use chrono::SecondsFormat;
use claim_swarm_core::domain::evidence::{CollectionQuery, CollectorError, EvidenceCollector};
use claim_swarm_core::domain::llm::{GenerationOutput, GenerationRequest, InferenceGateway, LLMError};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const PROMISE_EXTRACTION_INSTRUCTION: &str = "You extract concrete, verifiable promises about digital content from captured marketing evidence. Cite the evidence id and URL each promise came from. Return strict JSON.";
pub const LEGAL_MAPPING_INSTRUCTION: &str =
    "You map digital-content promise failures to consumer-law citations. Return strict JSON.";
pub const LETTER_DRAFTING_INSTRUCTION: &str =
    "Draft a formal Letter Before Action from provided facts and citations. Return strict JSON.";
pub const FILING_INSTRUCTION: &str =
    "Generate small-claims filing checklist and user actions. Return strict JSON.";

/// Collaborators a phase may call out to.
#[derive(Clone, Copy)]
pub struct PhaseContext<'a> {
    pub gateway: &'a dyn InferenceGateway,
    pub collector: &'a dyn EvidenceCollector,
}

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error(transparent)]
    Gateway(#[from] LLMError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error("Failed to serialize phase input: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait Phase: Send + Sync {
    fn kind(&self) -> PhaseKind;

    async fn execute(&self, state: &SwarmState, ctx: &PhaseContext<'_>) -> Result<StateUpdate, PhaseError>;
}

/// The five phases in run order.
pub fn default_phases() -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(CollectEvidencePhase),
        Box::new(ExtractPromisesPhase),
        Box::new(MapToLegalFindingsPhase),
        Box::new(DraftLetterPhase),
        Box::new(BuildFilingPacketPhase),
    ]
}

async fn call_gateway(
    ctx: &PhaseContext<'_>,
    phase: PhaseKind,
    instruction: &str,
    input: &impl Serialize,
) -> Result<GenerationOutput, PhaseError> {
    let user_content = serde_json::to_string(input)?;
    debug!(
        phase = %phase,
        gateway = %ctx.gateway.describe(),
        bytes = user_content.len(),
        "Requesting structured output"
    );
    let request = GenerationRequest::structured(instruction, user_content);
    Ok(ctx.gateway.generate(&request).await?)
}

pub struct CollectEvidencePhase;

#[async_trait]
impl Phase for CollectEvidencePhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::CollectEvidence
    }

    async fn execute(&self, state: &SwarmState, ctx: &PhaseContext<'_>) -> Result<StateUpdate, PhaseError> {
        let query = CollectionQuery {
            target_id: state.target_id(),
            subject_title: state.subject_title().to_string(),
            jurisdiction: state.jurisdiction().to_string(),
        };
        let sources = ctx.collector.collect(&query).await?;

        let evidence = sources
            .into_iter()
            .enumerate()
            .map(|(i, source)| EvidenceSource {
                evidence_id: state.next_evidence_id(i),
                url: source.url,
                title: source.title,
                captured_at_iso: source.captured_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                excerpt: source.excerpt,
            })
            .collect();

        Ok(StateUpdate::progress(self.kind().marker()).with_evidence(evidence))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromiseExtractionInput<'a> {
    jurisdiction: &'a str,
    subject_title: &'a str,
    evidence: &'a [EvidenceSource],
}

pub struct ExtractPromisesPhase;

#[async_trait]
impl Phase for ExtractPromisesPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::ExtractPromises
    }

    async fn execute(&self, state: &SwarmState, ctx: &PhaseContext<'_>) -> Result<StateUpdate, PhaseError> {
        let update = StateUpdate::progress(self.kind().marker());
        if state.evidence().is_empty() {
            debug!("No evidence captured, skipping promise extraction call");
            return Ok(update);
        }

        let input = PromiseExtractionInput {
            jurisdiction: state.jurisdiction(),
            subject_title: state.subject_title(),
            evidence: state.evidence(),
        };
        let output = call_gateway(ctx, self.kind(), PROMISE_EXTRACTION_INSTRUCTION, &input).await?;
        let promises = contract::validate_promises(output)?;

        Ok(update.with_promise_findings(promises))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegalMappingInput<'a> {
    jurisdiction: &'a str,
    promise_findings: &'a [PromiseFinding],
}

pub struct MapToLegalFindingsPhase;

#[async_trait]
impl Phase for MapToLegalFindingsPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::MapToLegalFindings
    }

    async fn execute(&self, state: &SwarmState, ctx: &PhaseContext<'_>) -> Result<StateUpdate, PhaseError> {
        let input = LegalMappingInput {
            jurisdiction: state.jurisdiction(),
            promise_findings: state.promise_findings(),
        };
        let output = call_gateway(ctx, self.kind(), LEGAL_MAPPING_INSTRUCTION, &input).await?;
        let findings = contract::validate_legal_findings(output)?;

        Ok(StateUpdate::progress(self.kind().marker()).with_legal_findings(findings))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LetterDraftingInput<'a> {
    jurisdiction: &'a str,
    subject_title: &'a str,
    promise_findings: &'a [PromiseFinding],
    legal_findings: &'a [LegalFinding],
}

pub struct DraftLetterPhase;

#[async_trait]
impl Phase for DraftLetterPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::DraftLetter
    }

    async fn execute(&self, state: &SwarmState, ctx: &PhaseContext<'_>) -> Result<StateUpdate, PhaseError> {
        let input = LetterDraftingInput {
            jurisdiction: state.jurisdiction(),
            subject_title: state.subject_title(),
            promise_findings: state.promise_findings(),
            legal_findings: state.legal_findings(),
        };
        let output = call_gateway(ctx, self.kind(), LETTER_DRAFTING_INSTRUCTION, &input).await?;
        let letter = contract::validate_letter(output)?;

        Ok(StateUpdate::progress(self.kind().marker()).with_letter(letter))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilingInput<'a> {
    jurisdiction: &'a str,
    legal_findings: &'a [LegalFinding],
}

pub struct BuildFilingPacketPhase;

#[async_trait]
impl Phase for BuildFilingPacketPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::BuildFilingPacket
    }

    async fn execute(&self, state: &SwarmState, ctx: &PhaseContext<'_>) -> Result<StateUpdate, PhaseError> {
        let input = FilingInput {
            jurisdiction: state.jurisdiction(),
            legal_findings: state.legal_findings(),
        };
        let output = call_gateway(ctx, self.kind(), FILING_INSTRUCTION, &input).await?;
        let packet = contract::validate_filing(output)?;

        Ok(StateUpdate::progress(self.kind().marker()).with_filing_packet(packet))
    }
}
