// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Phase Output Contracts
//!
//! Every gateway-calling phase declares the exact shape of the payload it
//! accepts. A payload is first checked against the phase's JSON Schema, which
//! reports every violation at once, and only then deserialized into the typed
//! records that enter [`SwarmState`](crate::domain::swarm::SwarmState).
//!
//! Nothing is defaulted: a missing field or a field of the wrong kind rejects
//! the whole payload.

use crate::domain::swarm::{FilingPacket, LegalFinding, LetterDraft, PromiseFinding};
use claim_swarm_core::domain::llm::GenerationOutput;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseContract {
    PromiseExtraction,
    LegalMapping,
    LetterDrafting,
    Filing,
}

impl PhaseContract {
    pub fn name(&self) -> &'static str {
        match self {
            PhaseContract::PromiseExtraction => "promise-extraction",
            PhaseContract::LegalMapping => "legal-mapping",
            PhaseContract::LetterDrafting => "letter-drafting",
            PhaseContract::Filing => "filing",
        }
    }

    /// JSON Schema the raw payload must satisfy
    pub fn schema(&self) -> Value {
        match self {
            PhaseContract::PromiseExtraction => json!({
                "type": "object",
                "required": ["promises"],
                "properties": {
                    "promises": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["promiseId", "text", "sourceEvidenceId", "sourceUrl"],
                            "properties": {
                                "promiseId": { "type": "string", "minLength": 1 },
                                "text": { "type": "string", "minLength": 1 },
                                "sourceEvidenceId": { "type": "string", "minLength": 1 },
                                "sourceUrl": { "type": "string", "minLength": 1 },
                                "sourceDateIso": { "type": ["string", "null"] }
                            }
                        }
                    }
                }
            }),
            PhaseContract::LegalMapping => json!({
                "type": "object",
                "required": ["legalFindings"],
                "properties": {
                    "legalFindings": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": [
                                "findingId",
                                "jurisdiction",
                                "legalCitation",
                                "analysis",
                                "relatedPromiseIds"
                            ],
                            "properties": {
                                "findingId": { "type": "string", "minLength": 1 },
                                "jurisdiction": { "type": "string", "minLength": 1 },
                                "legalCitation": { "type": "string", "minLength": 1 },
                                "analysis": { "type": "string", "minLength": 1 },
                                "relatedPromiseIds": {
                                    "type": "array",
                                    "items": { "type": "string" }
                                }
                            }
                        }
                    }
                }
            }),
            PhaseContract::LetterDrafting => json!({
                "type": "object",
                "required": ["letter"],
                "properties": {
                    "letter": {
                        "type": "object",
                        "required": ["subject", "markdown", "evidenceIndex"],
                        "properties": {
                            "subject": { "type": "string" },
                            "markdown": { "type": "string" },
                            "evidenceIndex": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "required": ["evidenceId", "description"],
                                    "properties": {
                                        "evidenceId": { "type": "string" },
                                        "description": { "type": "string" }
                                    }
                                }
                            }
                        }
                    }
                }
            }),
            PhaseContract::Filing => json!({
                "type": "object",
                "required": ["filing"],
                "properties": {
                    "filing": {
                        "type": "object",
                        "required": ["jurisdiction", "markdownInstructions", "requiredUserActions"],
                        "properties": {
                            "jurisdiction": { "type": "string" },
                            "markdownInstructions": { "type": "string" },
                            "requiredUserActions": {
                                "type": "array",
                                "items": { "type": "string" }
                            }
                        }
                    }
                }
            }),
        }
    }
}

impl fmt::Display for PhaseContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("{0} contract requires a structured payload, got text")]
    NotStructured(PhaseContract),

    #[error("{contract} payload violates contract: {}", .violations.join("; "))]
    Violation {
        contract: PhaseContract,
        violations: Vec<String>,
    },

    #[error("{contract} payload repeats id '{id}'")]
    DuplicateId { contract: PhaseContract, id: String },

    #[error("Invalid {contract} schema: {reason}")]
    Schema { contract: PhaseContract, reason: String },

    #[error("{contract} payload could not be decoded: {reason}")]
    Deserialize { contract: PhaseContract, reason: String },
}

#[derive(Deserialize)]
struct PromiseExtractionPayload {
    promises: Vec<PromiseFinding>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegalMappingPayload {
    legal_findings: Vec<LegalFinding>,
}

#[derive(Deserialize)]
struct LetterDraftingPayload {
    letter: LetterDraft,
}

#[derive(Deserialize)]
struct FilingPayload {
    filing: FilingPacket,
}

/// Check `output` against `contract` and decode it into `T`.
fn check<T: DeserializeOwned>(contract: PhaseContract, output: GenerationOutput) -> Result<T, ContractError> {
    let payload = output
        .into_structured()
        .ok_or(ContractError::NotStructured(contract))?;

    let validator = jsonschema::validator_for(&contract.schema()).map_err(|e| ContractError::Schema {
        contract,
        reason: e.to_string(),
    })?;

    let violations: Vec<String> = validator.iter_errors(&payload).map(|e| e.to_string()).collect();
    if !violations.is_empty() {
        return Err(ContractError::Violation { contract, violations });
    }

    serde_json::from_value(payload).map_err(|e| ContractError::Deserialize {
        contract,
        reason: e.to_string(),
    })
}

fn ensure_unique<'a>(
    contract: PhaseContract,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ContractError::DuplicateId {
                contract,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_promises(output: GenerationOutput) -> Result<Vec<PromiseFinding>, ContractError> {
    let contract = PhaseContract::PromiseExtraction;
    let payload: PromiseExtractionPayload = check(contract, output)?;
    ensure_unique(contract, payload.promises.iter().map(|p| p.promise_id.as_str()))?;
    Ok(payload.promises)
}

pub fn validate_legal_findings(output: GenerationOutput) -> Result<Vec<LegalFinding>, ContractError> {
    let contract = PhaseContract::LegalMapping;
    let payload: LegalMappingPayload = check(contract, output)?;
    ensure_unique(contract, payload.legal_findings.iter().map(|f| f.finding_id.as_str()))?;
    Ok(payload.legal_findings)
}

pub fn validate_letter(output: GenerationOutput) -> Result<LetterDraft, ContractError> {
    let payload: LetterDraftingPayload = check(PhaseContract::LetterDrafting, output)?;
    Ok(payload.letter)
}

pub fn validate_filing(output: GenerationOutput) -> Result<FilingPacket, ContractError> {
    let payload: FilingPayload = check(PhaseContract::Filing, output)?;
    Ok(payload.filing)
}
