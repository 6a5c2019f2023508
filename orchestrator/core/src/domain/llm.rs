// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Structured Inference Domain Interface
//!
//! Defines the one logical operation the workflow engine needs from a remote
//! model: "given a system instruction and some user content, produce text (or a
//! structured payload)". Vendor transports live in `infrastructure::llm` and are
//! hidden behind [`InferenceGateway`].
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GenerationRequest`] | System instruction + user content + [`ResponseMode`] |
//! | [`GenerationOutput`] | Parsed JSON payload or verbatim text |
//! | [`LLMError`] | Configuration / transport / decode failures |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Domain interface for structured inference backends.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Issue one generation call and decode its output.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, LLMError>;

    /// Short human-readable description (backend + model), for logs.
    fn describe(&self) -> String;
}

/// Output mode requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMode {
    /// Machine-parseable JSON payload.
    #[default]
    Structured,
    /// Free text, returned verbatim.
    PlainText,
}

impl ResponseMode {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResponseMode::Structured => "application/json",
            ResponseMode::PlainText => "text/plain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_content: String,
    pub mode: ResponseMode,
}

impl GenerationRequest {
    pub fn structured(system_instruction: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_content: user_content.into(),
            mode: ResponseMode::Structured,
        }
    }

    pub fn plain_text(system_instruction: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_content: user_content.into(),
            mode: ResponseMode::PlainText,
        }
    }
}

/// Decoded generation result.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
    Structured(serde_json::Value),
    Text(String),
}

impl GenerationOutput {
    pub fn into_structured(self) -> Option<serde_json::Value> {
        match self {
            GenerationOutput::Structured(value) => Some(value),
            GenerationOutput::Text(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            GenerationOutput::Text(text) => Some(text),
            GenerationOutput::Structured(_) => None,
        }
    }
}

/// Coarse classification used by callers to tell "unreachable" from
/// "reachable but returned nothing usable".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Transport,
    Decode,
}

/// Errors that can occur during gateway construction or calls
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Gateway call failed: HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway call exceeded deadline of {0:?}")]
    Timeout(Duration),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Backend returned no text output")]
    NoTextOutput,

    #[error("Response envelope is not valid JSON: {0}")]
    InvalidEnvelope(String),

    #[error("Structured payload is not well-formed JSON: {0}")]
    MalformedPayload(String),
}

impl LLMError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LLMError::Configuration(_) => ErrorCategory::Configuration,
            LLMError::Http { .. }
            | LLMError::Network(_)
            | LLMError::Timeout(_)
            | LLMError::Authentication(_) => ErrorCategory::Transport,
            LLMError::NoTextOutput | LLMError::InvalidEnvelope(_) | LLMError::MalformedPayload(_) => {
                ErrorCategory::Decode
            }
        }
    }

    /// Whether repeating the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LLMError::Network(_) | LLMError::Timeout(_) => true,
            LLMError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
