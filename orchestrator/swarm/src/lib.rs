// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `claim-swarm-engine`: Evidence-to-Filing Workflow Engine
//!
//! Threads a [`SwarmState`] through five fixed phases, each of which reads the
//! state, optionally asks the inference gateway for a structured payload,
//! checks that payload against its contract and folds the result back in.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `SwarmState` aggregate, phase contracts, `PhaseKind` |
//! | [`application`] | Application | `Phase` executors, `SwarmDriver` |
//!
//! ## Key Concepts
//!
//! - **Swarm State**: append-only record of progress markers, evidence,
//!   promises, legal findings, the letter and the filing packet.
//! - **Phase Contract**: the exact payload shape a phase accepts from the
//!   gateway. Anything else aborts the run.
//! - **Driver**: runs phases strictly in order and stops at the first failure,
//!   handing back the state accumulated so far.

pub mod application;
pub mod domain;

pub use application::{Phase, PhaseContext, PhaseError, SwarmDriver, SwarmRunFailure};
pub use domain::*;
