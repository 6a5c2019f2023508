// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Phase identity and the fixed run order.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    CollectEvidence,
    ExtractPromises,
    MapToLegalFindings,
    DraftLetter,
    BuildFilingPacket,
}

impl PhaseKind {
    /// The order every run executes phases in.
    pub const ALL: [PhaseKind; 5] = [
        PhaseKind::CollectEvidence,
        PhaseKind::ExtractPromises,
        PhaseKind::MapToLegalFindings,
        PhaseKind::DraftLetter,
        PhaseKind::BuildFilingPacket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::CollectEvidence => "collect-evidence",
            PhaseKind::ExtractPromises => "extract-promises",
            PhaseKind::MapToLegalFindings => "map-to-legal-findings",
            PhaseKind::DraftLetter => "draft-letter",
            PhaseKind::BuildFilingPacket => "build-filing-packet",
        }
    }

    /// Progress marker appended to the state when the phase completes
    pub fn marker(&self) -> &'static str {
        match self {
            PhaseKind::CollectEvidence => "Scraping 5 years of marketing...",
            PhaseKind::ExtractPromises => "Extracting concrete promises...",
            PhaseKind::MapToLegalFindings => "Matching to EU/UK law...",
            PhaseKind::DraftLetter => "Drafting Letter Before Action...",
            PhaseKind::BuildFilingPacket => "Preparing court filing packet...",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
