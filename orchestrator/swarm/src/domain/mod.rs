// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Engine Domain Layer
//!
//! Pure domain types for one evidence-to-filing run. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`swarm`] | `SwarmState`, `StateUpdate`, record types |
//! | [`contract`] | `PhaseContract`, `ContractError`, `validate_*` |
//! | [`phase`] | `PhaseKind` |

pub mod contract;
pub mod phase;
pub mod swarm;

pub use contract::{ContractError, PhaseContract};
pub use phase::PhaseKind;
pub use swarm::*;
