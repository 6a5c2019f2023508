// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `claim-swarm-core`
//!
//! Building blocks the claim swarm engine runs on.
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `InferenceGateway`, `EvidenceCollector`, `SwarmConfigManifest` |
//! | [`infrastructure`] | Infrastructure | Gemini transports, token exchange, URL collector |

pub mod domain;
pub mod infrastructure;

pub use domain::*;
