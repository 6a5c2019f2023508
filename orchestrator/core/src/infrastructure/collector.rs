// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Evidence collectors
//!
//! - [`NoopCollector`]: collects nothing; the collect-evidence phase then only
//!   records its progress marker.
//! - [`UrlEvidenceCollector`]: fetches configured seed pages concurrently and
//!   keeps their title plus a markdown excerpt.

use crate::domain::evidence::{CollectedSource, CollectionQuery, CollectorError, EvidenceCollector};
use crate::domain::swarm_config::CollectionConfig;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Characters of page text kept per source
const EXCERPT_LIMIT: usize = 2000;

pub struct NoopCollector;

#[async_trait]
impl EvidenceCollector for NoopCollector {
    async fn collect(&self, _query: &CollectionQuery) -> Result<Vec<CollectedSource>, CollectorError> {
        Ok(vec![])
    }
}

pub struct UrlEvidenceCollector {
    client: reqwest::Client,
    seed_urls: Vec<String>,
    max_concurrency: usize,
    title_pattern: Regex,
}

impl UrlEvidenceCollector {
    pub fn new(
        seed_urls: Vec<String>,
        max_concurrency: usize,
        timeout: Duration,
    ) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Configuration(e.to_string()))?;
        let title_pattern = Regex::new(r"(?is)<title[^>]*>(.*?)</title>")
            .map_err(|e| CollectorError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            seed_urls,
            max_concurrency: max_concurrency.max(1),
            title_pattern,
        })
    }

    pub fn from_config(config: &CollectionConfig) -> Result<Self, CollectorError> {
        Self::new(
            config.seed_urls.clone(),
            config.max_concurrency,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    async fn fetch(&self, url: &str) -> Result<CollectedSource, CollectorError> {
        let fetch_error = |reason: String| CollectorError::Fetch {
            url: url.to_string(),
            reason,
        };

        debug!(%url, "Fetching evidence source");

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html, text/plain;q=0.9, */*;q=0.5")
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("html"));

        let body = response.text().await.map_err(|e| fetch_error(e.to_string()))?;

        let (title, text) = if is_html {
            (self.extract_title(&body), html2md::parse_html(&body))
        } else {
            (None, body)
        };

        Ok(CollectedSource {
            url: url.to_string(),
            title,
            excerpt: excerpt(&text),
            captured_at: chrono::Utc::now(),
        })
    }

    fn extract_title(&self, html: &str) -> Option<String> {
        self.title_pattern
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
    }
}

fn excerpt(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(EXCERPT_LIMIT).collect())
}

#[async_trait]
impl EvidenceCollector for UrlEvidenceCollector {
    async fn collect(&self, query: &CollectionQuery) -> Result<Vec<CollectedSource>, CollectorError> {
        info!(
            target_id = query.target_id,
            sources = self.seed_urls.len(),
            "Collecting evidence from seed URLs"
        );

        // `buffered` keeps results in seed order regardless of completion order.
        let results: Vec<_> = stream::iter(self.seed_urls.clone())
            .map(|url| async move { self.fetch(&url).await })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut sources = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(source) => sources.push(source),
                Err(e) => warn!("Skipping evidence source: {}", e),
            }
        }

        Ok(sources)
    }
}
