// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Factory - Configuration to Adapter Resolution
//
// Turns a validated InferenceConfig into a ready InferenceGateway:
// resolves API keys, builds the token source for delegated-auth and
// applies deadline/retry settings.

use crate::domain::llm::{InferenceGateway, LLMError};
use crate::domain::swarm_config::{BackendKind, InferenceConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::gemini::{GeminiAdapter, GeminiTransport, RetryPolicy};
use super::token::{AccessTokenSource, ServiceAccountKey, ServiceAccountTokenSource, StaticAccessToken};

/// Build the gateway described by `config`.
///
/// Every failure here is a configuration error: it is raised at startup and
/// never retried.
pub fn build_gateway(config: &InferenceConfig) -> Result<Arc<dyn InferenceGateway>, LLMError> {
    config
        .validate()
        .map_err(|e| LLMError::Configuration(e.to_string()))?;

    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| LLMError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

    let transport = match config.backend {
        BackendKind::DirectKey => GeminiTransport::DirectKey {
            api_key: resolve_api_key(&config.api_key)?,
        },
        BackendKind::ExpressKey => GeminiTransport::ExpressKey {
            api_key: resolve_api_key(&config.api_key)?,
        },
        BackendKind::DelegatedAuth => GeminiTransport::DelegatedAuth {
            project: required(&config.project, "project")?,
            location: required(&config.location, "location")?,
            tokens: token_source(config, client.clone())?,
        },
    };

    info!(
        backend = %config.backend,
        model = %config.model,
        "Initializing inference gateway"
    );

    let mut adapter = GeminiAdapter::new(client, transport, config.model.clone())
        .with_temperature(config.temperature)
        .with_timeout(Duration::from_secs(config.timeout_seconds))
        .with_retry(RetryPolicy::from(&config.retry));

    if let Some(endpoint) = &config.endpoint {
        info!("Using inference endpoint override: {}", endpoint);
        adapter = adapter.with_host(endpoint.clone());
    }

    Ok(Arc::new(adapter))
}

fn token_source(
    config: &InferenceConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn AccessTokenSource>, LLMError> {
    if let Some(path) = &config.credentials_file {
        let key = ServiceAccountKey::from_file(path)?;
        return Ok(Arc::new(ServiceAccountTokenSource::new(client, key)?));
    }

    match config.access_token.as_deref() {
        Some(token) if !token.trim().is_empty() => Ok(Arc::new(StaticAccessToken::new(token))),
        _ => Err(LLMError::Configuration(
            "delegated-auth needs a credentials file or an access token".to_string(),
        )),
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, LLMError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LLMError::Configuration(format!("inference.{} is required", field)))
}

/// Resolve API key from config (supports "env:VAR_NAME" syntax)
pub fn resolve_api_key(key: &Option<String>) -> Result<String, LLMError> {
    match key.as_deref() {
        Some(k) => match k.strip_prefix("env:") {
            Some(var_name) => std::env::var(var_name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    LLMError::Configuration(format!("Environment variable not set: {}", var_name))
                }),
            None => Ok(k.to_string()),
        },
        None => Err(LLMError::Configuration("Missing API key".to_string())),
    }
}
