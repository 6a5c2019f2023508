// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Swarm Configuration Types
//
// Defines the configuration schema for a claim swarm deployment:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Inference backend selection (direct-key, express-key, delegated-auth)
// - Per-call deadline and retry policy
// - Evidence collection seeds
// - Logging settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const API_VERSION: &str = "claim-swarm/v1";
pub const KIND: &str = "SwarmConfig";

/// Top-level Kubernetes-style swarm configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfigManifest {
    /// API version (must be "claim-swarm/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "SwarmConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: SwarmConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmConfigSpec {
    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub collection: CollectionConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

/// Which transport binding the gateway uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// API key in a request header, public inference host
    #[default]
    DirectKey,
    /// API key in a query parameter, managed-platform host
    ExpressKey,
    /// Bearer token from a service-credential exchange, project + location scoped
    DelegatedAuth,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::DirectKey => "direct-key",
            BackendKind::ExpressKey => "express-key",
            BackendKind::DelegatedAuth => "delegated-auth",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct-key" | "direct" | "gemini" => Ok(BackendKind::DirectKey),
            "express-key" | "express" => Ok(BackendKind::ExpressKey),
            "delegated-auth" | "delegated" | "vertex" => Ok(BackendKind::DelegatedAuth),
            other => anyhow::bail!(
                "Unrecognized inference backend: '{}'. Expected direct-key, express-key or delegated-auth",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Model identifier for the provider API
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (supports "env:VAR_NAME" for environment variables)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Cloud project identifier (delegated-auth only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Cloud region, e.g. "us-central1" or "global" (delegated-auth only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Service-account key file exchanged for bearer tokens (delegated-auth only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Pre-issued bearer token, used when no credentials file is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Host override (e.g. a proxy); the variant's path is appended to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Deadline for a single gateway attempt
    #[serde(default = "default_inference_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: default_model(),
            api_key: None,
            project: None,
            location: None,
            credentials_file: None,
            access_token: None,
            endpoint: None,
            temperature: default_temperature(),
            timeout_seconds: default_inference_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per gateway call (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds, doubled each attempt
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Pages fetched by the collect-evidence phase, in order
    #[serde(default)]
    pub seed_urls: Vec<String>,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_collection_timeout")]
    pub timeout_seconds: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            seed_urls: vec![],
            max_concurrency: default_max_concurrency(),
            timeout_seconds: default_collection_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_inference_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_max_concurrency() -> usize {
    4
}

fn default_collection_timeout() -> u64 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for SwarmConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "claim-swarm".to_string(),
                labels: None,
            },
            spec: SwarmConfigSpec::default(),
        }
    }
}

impl SwarmConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CLAIM_SWARM_CONFIG_PATH environment variable
    /// 2. ./claim-swarm.yaml (working directory)
    /// 3. ~/.claim-swarm/config.yaml (user home)
    /// 4. /etc/claim-swarm/config.yaml (Unix only)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CLAIM_SWARM_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./claim-swarm.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".claim-swarm").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/claim-swarm/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Paths checked by [`Self::discover_config`], in order.
    pub fn discovery_paths() -> Vec<String> {
        let mut paths = vec![
            "$CLAIM_SWARM_CONFIG_PATH".to_string(),
            "./claim-swarm.yaml".to_string(),
            "~/.claim-swarm/config.yaml".to_string(),
        ];
        if cfg!(unix) {
            paths.push("/etc/claim-swarm/config.yaml".to_string());
        }
        paths
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path: fail if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides()?;
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset. An unrecognized `GEMINI_BACKEND` is
    /// an error rather than a warning: a typo there would silently route calls
    /// to the wrong transport.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let inference = &mut self.spec.inference;

        if let Some(val) = get("GEMINI_BACKEND") {
            inference.backend = val.parse()?;
            tracing::info!("Environment override: GEMINI_BACKEND={}", inference.backend);
        }
        if let Some(val) = get("GEMINI_MODEL") {
            tracing::info!("Environment override: GEMINI_MODEL={}", val);
            inference.model = val;
        }
        if let Some(val) = get("GEMINI_API_KEY") {
            tracing::info!("Environment override: GEMINI_API_KEY=<redacted>");
            inference.api_key = Some(val);
        }
        if let Some(val) = get("GOOGLE_CLOUD_PROJECT") {
            tracing::info!("Environment override: GOOGLE_CLOUD_PROJECT={}", val);
            inference.project = Some(val);
        }
        if let Some(val) = get("GOOGLE_CLOUD_LOCATION") {
            tracing::info!("Environment override: GOOGLE_CLOUD_LOCATION={}", val);
            inference.location = Some(val);
        }
        if let Some(val) = get("GOOGLE_APPLICATION_CREDENTIALS") {
            tracing::info!("Environment override: GOOGLE_APPLICATION_CREDENTIALS={}", val);
            inference.credentials_file = Some(PathBuf::from(val));
        }
        if let Some(val) = get("GOOGLE_OAUTH_ACCESS_TOKEN") {
            tracing::info!("Environment override: GOOGLE_OAUTH_ACCESS_TOKEN=<redacted>");
            inference.access_token = Some(val);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        self.spec.inference.validate()?;

        let collection = &self.spec.collection;
        if collection.max_concurrency == 0 {
            anyhow::bail!("collection.max_concurrency must be at least 1");
        }
        for seed in &collection.seed_urls {
            url::Url::parse(seed)
                .map_err(|e| anyhow::anyhow!("Invalid seed URL '{}': {}", seed, e))?;
        }

        Ok(())
    }
}

impl InferenceConfig {
    /// Validate the per-backend invariants
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model.trim().is_empty() {
            anyhow::bail!("inference.model cannot be empty");
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "inference.temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            );
        }

        if self.timeout_seconds == 0 {
            anyhow::bail!("inference.timeout_seconds must be greater than zero");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("inference.retry.max_attempts must be at least 1");
        }

        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| anyhow::anyhow!("Invalid inference.endpoint '{}': {}", endpoint, e))?;
        }

        match self.backend {
            BackendKind::DirectKey | BackendKind::ExpressKey => {
                if is_blank(&self.api_key) {
                    anyhow::bail!("inference.api_key is required for backend {}", self.backend);
                }
            }
            BackendKind::DelegatedAuth => {
                if is_blank(&self.project) {
                    anyhow::bail!("inference.project is required for backend {}", self.backend);
                }
                if is_blank(&self.location) {
                    anyhow::bail!("inference.location is required for backend {}", self.backend);
                }
                if self.credentials_file.is_none() && is_blank(&self.access_token) {
                    anyhow::bail!(
                        "backend {} needs inference.credentials_file or inference.access_token",
                        self.backend
                    );
                }
            }
        }

        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).is_none_or(str::is_empty)
}
