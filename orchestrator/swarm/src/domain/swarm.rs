// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm State Aggregate
//!
//! The accumulating record threaded through one workflow run:
//!
//! - [`SwarmState`]: aggregate root, owned by value by a single run.
//! - [`ClaimId`]: opaque run identifier.
//! - [`StateUpdate`]: the fields a phase changed or appended to.
//! - Record types: [`EvidenceSource`], [`PromiseFinding`], [`LegalFinding`],
//!   [`LetterDraft`], [`FilingPacket`].
//!
//! The wire shape is camelCase JSON, the same shape phase prompts embed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Opaque, stable identifier for one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(String);

impl ClaimId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random `ClaimId`.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSource {
    pub evidence_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub captured_at_iso: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromiseFinding {
    pub promise_id: String,
    pub text: String,
    pub source_evidence_id: String,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_date_iso: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalFinding {
    pub finding_id: String,
    pub jurisdiction: String,
    pub legal_citation: String,
    pub analysis: String,
    pub related_promise_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceIndexEntry {
    pub evidence_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterDraft {
    pub subject: String,
    pub markdown: String,
    pub evidence_index: Vec<EvidenceIndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingPacket {
    pub jurisdiction: String,
    pub markdown_instructions: String,
    pub required_user_actions: Vec<String>,
}

/// Aggregate root for one evidence-to-filing run.
///
/// # Invariants
///
/// - `claim_id`, `target_id` and `jurisdiction` never change after creation.
/// - `progress_log`, `evidence` and `promise_findings` only grow.
/// - `legal_findings` may be replaced, but only by a list that starts with
///   the current entries.
/// - Every promise references an evidence id present in `evidence`.
/// - `letter` and `filing_packet` are set at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmState {
    claim_id: ClaimId,
    target_id: u64,
    subject_title: String,
    jurisdiction: String,
    #[serde(default)]
    progress_log: Vec<String>,
    #[serde(default)]
    evidence: Vec<EvidenceSource>,
    #[serde(default)]
    promise_findings: Vec<PromiseFinding>,
    #[serde(default)]
    legal_findings: Vec<LegalFinding>,
    #[serde(default)]
    letter: Option<LetterDraft>,
    #[serde(default)]
    filing_packet: Option<FilingPacket>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Evidence id '{0}' is already present")]
    DuplicateEvidence(String),

    #[error("Promise id '{0}' is already present")]
    DuplicatePromise(String),

    #[error("Promise '{promise_id}' references unknown evidence '{evidence_id}'")]
    DanglingEvidence {
        promise_id: String,
        evidence_id: String,
    },

    #[error("Legal findings update would drop or reorder existing findings")]
    LegalFindingsRewritten,

    #[error("{0} is already set and cannot be replaced")]
    AlreadySet(&'static str),
}

/// Fields a phase changed or appended to. Empty vectors and `None` mean
/// "untouched".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub progress: Vec<String>,
    pub subject_title: Option<String>,
    pub evidence: Vec<EvidenceSource>,
    pub promise_findings: Vec<PromiseFinding>,
    pub legal_findings: Option<Vec<LegalFinding>>,
    pub letter: Option<LetterDraft>,
    pub filing_packet: Option<FilingPacket>,
}

impl StateUpdate {
    /// An update that only records a progress marker
    pub fn progress(marker: impl Into<String>) -> Self {
        Self {
            progress: vec![marker.into()],
            ..Self::default()
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<EvidenceSource>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_promise_findings(mut self, promises: Vec<PromiseFinding>) -> Self {
        self.promise_findings = promises;
        self
    }

    pub fn with_legal_findings(mut self, findings: Vec<LegalFinding>) -> Self {
        self.legal_findings = Some(findings);
        self
    }

    pub fn with_letter(mut self, letter: LetterDraft) -> Self {
        self.letter = Some(letter);
        self
    }

    pub fn with_filing_packet(mut self, packet: FilingPacket) -> Self {
        self.filing_packet = Some(packet);
        self
    }

    pub fn with_subject_title(mut self, title: impl Into<String>) -> Self {
        self.subject_title = Some(title.into());
        self
    }
}

impl SwarmState {
    /// Create the initial state for a run. Inputs are caller-validated.
    pub fn new(
        claim_id: ClaimId,
        target_id: u64,
        subject_title: impl Into<String>,
        jurisdiction: impl Into<String>,
    ) -> Self {
        Self {
            claim_id,
            target_id,
            subject_title: subject_title.into(),
            jurisdiction: jurisdiction.into(),
            progress_log: vec![],
            evidence: vec![],
            promise_findings: vec![],
            legal_findings: vec![],
            letter: None,
            filing_packet: None,
        }
    }

    pub fn claim_id(&self) -> &ClaimId {
        &self.claim_id
    }

    pub fn target_id(&self) -> u64 {
        self.target_id
    }

    pub fn subject_title(&self) -> &str {
        &self.subject_title
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    pub fn progress_log(&self) -> &[String] {
        &self.progress_log
    }

    pub fn evidence(&self) -> &[EvidenceSource] {
        &self.evidence
    }

    pub fn promise_findings(&self) -> &[PromiseFinding] {
        &self.promise_findings
    }

    pub fn legal_findings(&self) -> &[LegalFinding] {
        &self.legal_findings
    }

    pub fn letter(&self) -> Option<&LetterDraft> {
        self.letter.as_ref()
    }

    pub fn filing_packet(&self) -> Option<&FilingPacket> {
        self.filing_packet.as_ref()
    }

    /// Identifier the next appended evidence record should use
    pub fn next_evidence_id(&self, offset: usize) -> String {
        format!("ev-{}", self.evidence.len() + offset + 1)
    }

    /// Fold `update` into the state.
    ///
    /// All invariants are checked before anything is written, so a rejected
    /// update leaves the state exactly as it was.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), StateError> {
        let mut evidence_ids: HashSet<&str> =
            self.evidence.iter().map(|e| e.evidence_id.as_str()).collect();
        for source in &update.evidence {
            if !evidence_ids.insert(source.evidence_id.as_str()) {
                return Err(StateError::DuplicateEvidence(source.evidence_id.clone()));
            }
        }

        let mut promise_ids: HashSet<&str> = self
            .promise_findings
            .iter()
            .map(|p| p.promise_id.as_str())
            .collect();
        for promise in &update.promise_findings {
            if !evidence_ids.contains(promise.source_evidence_id.as_str()) {
                return Err(StateError::DanglingEvidence {
                    promise_id: promise.promise_id.clone(),
                    evidence_id: promise.source_evidence_id.clone(),
                });
            }
            if !promise_ids.insert(promise.promise_id.as_str()) {
                return Err(StateError::DuplicatePromise(promise.promise_id.clone()));
            }
        }

        if let Some(findings) = &update.legal_findings {
            if !findings.starts_with(&self.legal_findings) {
                return Err(StateError::LegalFindingsRewritten);
            }
        }

        if update.letter.is_some() && self.letter.is_some() {
            return Err(StateError::AlreadySet("letter"));
        }

        if update.filing_packet.is_some() && self.filing_packet.is_some() {
            return Err(StateError::AlreadySet("filingPacket"));
        }

        self.progress_log.extend(update.progress);
        self.evidence.extend(update.evidence);
        self.promise_findings.extend(update.promise_findings);
        if let Some(findings) = update.legal_findings {
            self.legal_findings = findings;
        }
        if let Some(title) = update.subject_title {
            self.subject_title = title;
        }
        if let Some(letter) = update.letter {
            self.letter = Some(letter);
        }
        if let Some(packet) = update.filing_packet {
            self.filing_packet = Some(packet);
        }

        Ok(())
    }
}
