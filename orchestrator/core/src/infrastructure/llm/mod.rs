// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Inference Gateway Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between the domain InferenceGateway interface and
// an external generateContent API.

pub mod gemini;
pub mod token;
pub mod factory;

pub use factory::build_gateway;
pub use gemini::{GeminiAdapter, GeminiTransport, RetryPolicy};
pub use token::{AccessTokenSource, ServiceAccountTokenSource, StaticAccessToken};
