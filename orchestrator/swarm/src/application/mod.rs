// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Engine Application Layer
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`phases`] | `Phase` trait and the five executors |
//! | [`driver`] | `SwarmDriver`, `SwarmRunFailure` |

pub mod driver;
pub mod phases;

pub use driver::{SwarmDriver, SwarmRunFailure};
pub use phases::{Phase, PhaseContext, PhaseError};
