// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain interfaces and configuration types. No I/O.

pub mod llm;
pub mod evidence;
pub mod swarm_config;
