// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gemini Inference Adapter
//
// Anti-Corruption Layer for the generateContent API.
// One request body, three transport bindings:
// - direct-key:     public host, key in x-goog-api-key header
// - express-key:    platform host, key in ?key= query parameter
// - delegated-auth: project/location-scoped platform host, bearer token

use crate::domain::llm::{GenerationOutput, GenerationRequest, InferenceGateway, LLMError, ResponseMode};
use crate::domain::swarm_config::RetryConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::token::AccessTokenSource;

pub const PUBLIC_HOST: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const PLATFORM_HOST: &str = "https://aiplatform.googleapis.com/v1";

/// Maximum characters of an error body kept for diagnostics
const ERROR_BODY_EXCERPT: usize = 500;

/// How the request is addressed and authenticated.
#[derive(Clone)]
pub enum GeminiTransport {
    DirectKey {
        api_key: String,
    },
    ExpressKey {
        api_key: String,
    },
    DelegatedAuth {
        project: String,
        location: String,
        tokens: Arc<dyn AccessTokenSource>,
    },
}

impl GeminiTransport {
    pub fn name(&self) -> &'static str {
        match self {
            GeminiTransport::DirectKey { .. } => "direct-key",
            GeminiTransport::ExpressKey { .. } => "express-key",
            GeminiTransport::DelegatedAuth { .. } => "delegated-auth",
        }
    }

    /// Host used when no endpoint override is configured
    pub fn default_host(&self) -> String {
        match self {
            GeminiTransport::DirectKey { .. } => PUBLIC_HOST.to_string(),
            GeminiTransport::ExpressKey { .. } => PLATFORM_HOST.to_string(),
            GeminiTransport::DelegatedAuth { location, .. } => {
                if location == "global" {
                    PLATFORM_HOST.to_string()
                } else {
                    format!("https://{}-aiplatform.googleapis.com/v1", location)
                }
            }
        }
    }

    fn model_path(&self, model: &str) -> String {
        match self {
            GeminiTransport::DirectKey { .. } => format!("/models/{}:generateContent", model),
            GeminiTransport::ExpressKey { .. } => {
                format!("/publishers/google/models/{}:generateContent", model)
            }
            GeminiTransport::DelegatedAuth { project, location, .. } => format!(
                "/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                project, location, model
            ),
        }
    }
}

/// Attempt budget for one logical gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_delay_ms: 1000,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff before the attempt following `attempt` (0-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(2_u64.saturating_pow(attempt)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    temperature: f32,
}

pub struct GeminiAdapter {
    client: reqwest::Client,
    host: String,
    model: String,
    transport: GeminiTransport,
    temperature: f32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client, transport: GeminiTransport, model: String) -> Self {
        Self {
            client,
            host: transport.default_host(),
            model,
            transport,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the host (proxy, regional mirror, test server)
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint_url(&self) -> String {
        format!(
            "{}{}",
            self.host.trim_end_matches('/'),
            self.transport.model_path(&self.model)
        )
    }

    fn build_body(&self, request: &GenerationRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.user_content.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: request.mode.mime_type().to_string(),
                temperature: self.temperature,
            },
        }
    }

    async fn send_once(&self, body: &GenerateContentRequest, mode: ResponseMode) -> Result<GenerationOutput, LLMError> {
        let url = self.endpoint_url();
        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        builder = match &self.transport {
            GeminiTransport::DirectKey { api_key } => builder.header("x-goog-api-key", api_key),
            GeminiTransport::ExpressKey { api_key } => builder.query(&[("key", api_key)]),
            GeminiTransport::DelegatedAuth { tokens, .. } => {
                let token = tokens.access_token().await?;
                builder.bearer_auth(token)
            }
        };

        debug!(backend = self.transport.name(), %url, "Sending generateContent request");

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), &text));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        let envelope: Value =
            serde_json::from_str(&text).map_err(|e| LLMError::InvalidEnvelope(e.to_string()))?;
        let output_text = extract_text(&envelope)?;
        decode_output(output_text, mode)
    }

    async fn attempt(&self, body: &GenerateContentRequest, mode: ResponseMode) -> Result<GenerationOutput, LLMError> {
        match tokio::time::timeout(self.timeout, self.send_once(body, mode)).await {
            Ok(result) => result,
            Err(_) => Err(LLMError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl InferenceGateway for GeminiAdapter {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, LLMError> {
        let body = self.build_body(request);
        let backend = self.transport.name();

        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let result = self.attempt(&body, request.mode).await;
            metrics::histogram!("claim_swarm_gateway_latency_seconds", "backend" => backend)
                .record(started.elapsed().as_secs_f64());

            match result {
                Ok(output) => {
                    metrics::counter!("claim_swarm_gateway_requests_total", "backend" => backend, "outcome" => "success")
                        .increment(1);
                    info!(backend, model = %self.model, attempt = attempt + 1, "Gateway call succeeded");
                    return Ok(output);
                }
                Err(e) => {
                    metrics::counter!("claim_swarm_gateway_requests_total", "backend" => backend, "outcome" => "failure")
                        .increment(1);
                    attempt += 1;
                    if attempt >= self.retry.max_attempts || !e.is_transient() {
                        return Err(e);
                    }
                    let delay = self.retry.delay_after(attempt - 1);
                    warn!(
                        backend,
                        "Gateway call failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt,
                        self.retry.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.transport.name(), self.model)
    }
}

/// Scan the first candidate's parts for the first non-empty text field.
///
/// The envelope is treated as untyped: any missing level, wrong kind or empty
/// string is skipped rather than failing deserialization.
pub fn extract_text(envelope: &Value) -> Result<String, LLMError> {
    envelope
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .find(|text| !text.is_empty())
        })
        .map(str::to_string)
        .ok_or(LLMError::NoTextOutput)
}

pub fn decode_output(text: String, mode: ResponseMode) -> Result<GenerationOutput, LLMError> {
    match mode {
        ResponseMode::Structured => serde_json::from_str(&text)
            .map(GenerationOutput::Structured)
            .map_err(|e| LLMError::MalformedPayload(e.to_string())),
        ResponseMode::PlainText => Ok(GenerationOutput::Text(text)),
    }
}

/// First `limit` characters of `body`, on a char boundary
fn excerpt(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}

/// Non-success status; an unreadable body still reports the status.
fn http_error(status: u16, body: &str) -> LLMError {
    LLMError::Http {
        status,
        body: excerpt(body, ERROR_BODY_EXCERPT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::token::StaticAccessToken;
    use mockito::Matcher;
    use serde_json::json;

    fn envelope_with(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    fn adapter(server: &mockito::Server, transport: GeminiTransport) -> GeminiAdapter {
        GeminiAdapter::new(reqwest::Client::new(), transport, "gemini-test".to_string())
            .with_host(server.url())
    }

    #[test]
    fn test_extract_first_non_empty_part() {
        let envelope = json!({
            "candidates": [{ "content": { "parts": [{ "text": "" }, { "text": "X" }] } }]
        });
        assert_eq!(extract_text(&envelope).unwrap(), "X");
    }

    #[test]
    fn test_extract_empty_candidates_is_decode_error() {
        let envelope = json!({ "candidates": [] });
        assert!(matches!(extract_text(&envelope), Err(LLMError::NoTextOutput)));
    }

    #[test]
    fn test_extract_tolerates_loose_shapes() {
        assert!(matches!(extract_text(&json!({})), Err(LLMError::NoTextOutput)));
        assert!(matches!(
            extract_text(&json!({ "candidates": [{ "content": {} }] })),
            Err(LLMError::NoTextOutput)
        ));
        // Non-string text and parts without text are skipped
        let envelope = json!({
            "candidates": [{ "content": { "parts": [{ "text": 7 }, { "inlineData": {} }, { "text": "ok" }] } }]
        });
        assert_eq!(extract_text(&envelope).unwrap(), "ok");
        // Only the first candidate is considered
        let envelope = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "" }] } },
                { "content": { "parts": [{ "text": "second" }] } }
            ]
        });
        assert!(matches!(extract_text(&envelope), Err(LLMError::NoTextOutput)));
    }

    #[test]
    fn test_decode_output_modes() {
        let structured = decode_output(r#"{"a":1}"#.to_string(), ResponseMode::Structured).unwrap();
        assert_eq!(structured, GenerationOutput::Structured(json!({ "a": 1 })));

        let text = decode_output("not json".to_string(), ResponseMode::PlainText).unwrap();
        assert_eq!(text, GenerationOutput::Text("not json".to_string()));

        assert!(matches!(
            decode_output("not json".to_string(), ResponseMode::Structured),
            Err(LLMError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_default_hosts() {
        let direct = GeminiTransport::DirectKey { api_key: "k".into() };
        assert_eq!(direct.default_host(), PUBLIC_HOST);

        let tokens: Arc<dyn AccessTokenSource> = Arc::new(StaticAccessToken::new("t"));
        let regional = GeminiTransport::DelegatedAuth {
            project: "p".into(),
            location: "europe-west2".into(),
            tokens: tokens.clone(),
        };
        assert_eq!(regional.default_host(), "https://europe-west2-aiplatform.googleapis.com/v1");

        let global = GeminiTransport::DelegatedAuth {
            project: "p".into(),
            location: "global".into(),
            tokens,
        };
        assert_eq!(global.default_host(), PLATFORM_HOST);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy { max_attempts: 4, retry_delay_ms: 100 };
        assert_eq!(policy.delay_after(0), Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_direct_key_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "secret")
            .match_body(Matcher::Json(json!({
                "systemInstruction": { "parts": [{ "text": "sys" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "user" }] }],
                "generationConfig": { "responseMimeType": "application/json", "temperature": 0.2 }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope_with(r#"{"ok":true}"#))
            .create_async()
            .await;

        let gateway = adapter(&server, GeminiTransport::DirectKey { api_key: "secret".into() });
        let output = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap();

        assert_eq!(output, GenerationOutput::Structured(json!({ "ok": true })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_express_key_uses_query_parameter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/publishers/google/models/gemini-test:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": { "responseMimeType": "text/plain" }
            })))
            .with_status(200)
            .with_body(envelope_with("plain answer"))
            .create_async()
            .await;

        let gateway = adapter(&server, GeminiTransport::ExpressKey { api_key: "secret".into() });
        let output = gateway
            .generate(&GenerationRequest::plain_text("sys", "user"))
            .await
            .unwrap();

        assert_eq!(output, GenerationOutput::Text("plain answer".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delegated_auth_uses_bearer_token_and_scoped_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/projects/proj-1/locations/us-central1/publishers/google/models/gemini-test:generateContent",
            )
            .match_header("authorization", "Bearer ya29.static")
            .with_status(200)
            .with_body(envelope_with("[]"))
            .create_async()
            .await;

        let transport = GeminiTransport::DelegatedAuth {
            project: "proj-1".into(),
            location: "us-central1".into(),
            tokens: Arc::new(StaticAccessToken::new("ya29.static")),
        };
        let gateway = adapter(&server, transport);
        let output = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap();

        assert_eq!(output, GenerationOutput::Structured(json!([])));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_truncates_body() {
        let mut server = mockito::Server::new_async().await;
        let long_body = "e".repeat(2000);
        server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(500)
            .with_body(&long_body)
            .create_async()
            .await;

        let gateway = adapter(&server, GeminiTransport::DirectKey { api_key: "k".into() });
        let err = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap_err();

        match err {
            LLMError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), ERROR_BODY_EXCERPT);
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_envelope_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let gateway = adapter(&server, GeminiTransport::DirectKey { api_key: "k".into() });
        let err = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::NoTextOutput));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let gateway = adapter(&server, GeminiTransport::DirectKey { api_key: "k".into() })
            .with_retry(RetryPolicy { max_attempts: 3, retry_delay_ms: 1 });
        let err = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap_err();

        assert!(matches!(err, LLMError::Http { status: 503, .. }));
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(400)
            .expect(1)
            .create_async()
            .await;

        let gateway = adapter(&server, GeminiTransport::DirectKey { api_key: "k".into() })
            .with_retry(RetryPolicy { max_attempts: 3, retry_delay_ms: 1 });
        let err = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap_err();

        assert!(matches!(err, LLMError::Http { status: 400, .. }));
        rejected.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let gateway = GeminiAdapter::new(
            reqwest::Client::new(),
            GeminiTransport::DirectKey { api_key: "k".into() },
            "gemini-test".to_string(),
        )
        .with_host("http://127.0.0.1:1");

        let err = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::Network(_)));
    }

    /// Accepts connections and reads requests but never answers.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    /// Answers with a status line and a body shorter than its Content-Length.
    async fn truncating_server(status_line: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!("{}\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort", status_line);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_transport_timeout() {
        let host = silent_server().await;
        let gateway = GeminiAdapter::new(
            reqwest::Client::new(),
            GeminiTransport::DirectKey { api_key: "k".into() },
            "gemini-test".to_string(),
        )
        .with_host(host)
        .with_timeout(Duration::from_millis(200))
        .with_retry(RetryPolicy { max_attempts: 2, retry_delay_ms: 1 });

        let started = Instant::now();
        let err = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap_err();

        assert!(matches!(err, LLMError::Timeout(d) if d == Duration::from_millis(200)));
        assert_eq!(err.category(), crate::domain::llm::ErrorCategory::Transport);
        // Both attempts hit the deadline
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_unreadable_error_body_keeps_status() {
        let host = truncating_server("HTTP/1.1 502 Bad Gateway").await;
        let gateway = GeminiAdapter::new(
            reqwest::Client::new(),
            GeminiTransport::DirectKey { api_key: "k".into() },
            "gemini-test".to_string(),
        )
        .with_host(host);

        let err = gateway
            .generate(&GenerationRequest::structured("sys", "user"))
            .await
            .unwrap_err();

        assert!(matches!(err, LLMError::Http { status: 502, .. }), "got {:?}", err);
    }

    #[test]
    fn test_http_error_bounds_body() {
        let err = http_error(503, &"x".repeat(ERROR_BODY_EXCERPT * 3));
        match err {
            LLMError::Http { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body.len(), ERROR_BODY_EXCERPT);
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }
        assert!(matches!(http_error(500, ""), LLMError::Http { status: 500, ref body } if body.is_empty()));
    }

    #[tokio::test]
    async fn test_plain_text_mode_returns_verbatim_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": { "responseMimeType": "text/plain" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope_with("Dear Sir or Madam,"))
            .create_async()
            .await;

        let gateway = adapter(&server, GeminiTransport::DirectKey { api_key: "k".into() });
        let output = gateway
            .generate(&GenerationRequest::plain_text("sys", "user"))
            .await
            .unwrap();

        assert_eq!(output.clone().into_structured(), None);
        assert_eq!(output.into_text().as_deref(), Some("Dear Sir or Madam,"));
        mock.assert_async().await;
    }
}
