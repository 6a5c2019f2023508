// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Evidence Collection Interface
//!
//! Tool-invocation contract used by the collect-evidence phase. A collector
//! turns a [`CollectionQuery`] into raw [`CollectedSource`]s; assigning
//! evidence identifiers and merging into the run state is the engine's job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionQuery {
    pub target_id: u64,
    pub subject_title: String,
    pub jurisdiction: String,
}

/// One captured public source, before it has an evidence id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedSource {
    pub url: String,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Collector misconfigured: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait EvidenceCollector: Send + Sync {
    /// Sources in a stable order; callers append them in the order returned.
    async fn collect(&self, query: &CollectionQuery) -> Result<Vec<CollectedSource>, CollectorError>;
}
