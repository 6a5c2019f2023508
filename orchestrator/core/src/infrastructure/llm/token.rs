// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Delegated-auth access tokens
//
// Exchanges a service-account key for a short-lived bearer token using the
// JWT-bearer grant, scoped to the cloud platform. Tokens are cached until
// shortly before expiry; concurrent callers wait on the same refresh.

use crate::domain::llm::LLMError;
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before the issuer's expiry
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, LLMError>;
}

/// A token issued out of band (e.g. `gcloud auth print-access-token`).
pub struct StaticAccessToken {
    token: String,
}

impl StaticAccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenSource for StaticAccessToken {
    async fn access_token(&self) -> Result<String, LLMError> {
        Ok(self.token.clone())
    }
}

/// Fields of a service-account key file that the exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LLMError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LLMError::Configuration(format!("Failed to read credentials file {:?}: {}", path, e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, LLMError> {
        serde_json::from_str(json)
            .map_err(|e| LLMError::Configuration(format!("Invalid service-account key: {}", e)))
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

pub struct ServiceAccountTokenSource {
    client: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(client: reqwest::Client, key: ServiceAccountKey) -> Result<Self, LLMError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            LLMError::Configuration(format!("Invalid service-account private key: {}", e))
        })?;

        Ok(Self {
            client,
            key,
            encoding_key,
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            cached: Mutex::new(None),
        })
    }

    fn signed_assertion(&self) -> Result<String, LLMError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| LLMError::Authentication(format!("Failed to sign assertion: {}", e)))
    }

    async fn exchange(&self) -> Result<CachedToken, LLMError> {
        let assertion = self.signed_assertion()?;

        debug!(token_uri = %self.key.token_uri, "Exchanging service-account assertion");

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::Authentication(format!(
                "Token exchange failed: HTTP {}: {}",
                status,
                error_text.chars().take(500).collect::<String>()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Authentication(format!("Invalid token response: {}", e)))?;

        info!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Obtained delegated access token"
        );

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_SKEW);
        Ok(CachedToken {
            token: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, LLMError> {
        // Held across the exchange so only one refresh is in flight.
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
