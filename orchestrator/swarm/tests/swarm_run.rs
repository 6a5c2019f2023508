// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use claim_swarm_core::domain::evidence::{CollectedSource, CollectionQuery, CollectorError, EvidenceCollector};
use claim_swarm_core::domain::llm::{ErrorCategory, GenerationOutput, GenerationRequest, InferenceGateway, LLMError};
use claim_swarm_engine::application::phases::{
    FILING_INSTRUCTION, LEGAL_MAPPING_INSTRUCTION, LETTER_DRAFTING_INSTRUCTION, PROMISE_EXTRACTION_INSTRUCTION,
};
use claim_swarm_engine::{ClaimId, LegalFinding, PhaseError, PhaseKind, SwarmDriver, SwarmState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn legal_findings() -> Value {
    json!([
        {
            "findingId": "f1",
            "jurisdiction": "UK",
            "legalCitation": "Consumer Rights Act 2015, s.34",
            "analysis": "Digital content does not match its description.",
            "relatedPromiseIds": []
        },
        {
            "findingId": "f2",
            "jurisdiction": "UK",
            "legalCitation": "Consumer Protection from Unfair Trading Regulations 2008, reg.5",
            "analysis": "Misleading action in pre-release marketing.",
            "relatedPromiseIds": []
        }
    ])
}

/// Answers each phase by its system instruction, optionally failing one.
struct StubGateway {
    fail_on: Option<&'static str>,
    calls: AtomicUsize,
}

impl StubGateway {
    fn new() -> Self {
        Self { fail_on: None, calls: AtomicUsize::new(0) }
    }

    fn failing_on(instruction: &'static str) -> Self {
        Self { fail_on: Some(instruction), calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl InferenceGateway for StubGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let instruction = request.system_instruction.as_str();
        if self.fail_on == Some(instruction) {
            return Err(LLMError::Http { status: 500, body: "internal".to_string() });
        }

        let payload = match instruction {
            LEGAL_MAPPING_INSTRUCTION => json!({ "legalFindings": legal_findings() }),
            LETTER_DRAFTING_INSTRUCTION => json!({
                "letter": {
                    "subject": "Letter Before Action: Vapor Game",
                    "markdown": "# Letter Before Action\n\nDear Sir or Madam,",
                    "evidenceIndex": []
                }
            }),
            FILING_INSTRUCTION => json!({
                "filing": {
                    "jurisdiction": "UK",
                    "markdownInstructions": "Issue the claim through Money Claim Online.",
                    "requiredUserActions": ["Sign the statement of truth", "Pay the issue fee"]
                }
            }),
            PROMISE_EXTRACTION_INSTRUCTION => json!({
                "promises": [{
                    "promiseId": "p1",
                    "text": "Online multiplayer at launch",
                    "sourceEvidenceId": "ev-1",
                    "sourceUrl": "https://vapor.example/roadmap"
                }]
            }),
            other => panic!("unexpected instruction: {}", other),
        };
        Ok(GenerationOutput::Structured(payload))
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

struct RoadmapCollector;

#[async_trait]
impl EvidenceCollector for RoadmapCollector {
    async fn collect(&self, query: &CollectionQuery) -> Result<Vec<CollectedSource>, CollectorError> {
        assert_eq!(query.target_id, 42);
        Ok(vec![CollectedSource {
            url: "https://vapor.example/roadmap".to_string(),
            title: Some("Roadmap".to_string()),
            excerpt: Some("Online multiplayer at launch".to_string()),
            captured_at: chrono::Utc::now(),
        }])
    }
}

fn initial_state() -> SwarmState {
    SwarmState::new(ClaimId::new("c1"), 42, "Vapor Game", "UK")
}

fn markers(phases: &[PhaseKind]) -> Vec<String> {
    phases.iter().map(|p| p.marker().to_string()).collect()
}

#[tokio::test]
async fn test_full_run_with_stub_gateway() {
    let gateway = Arc::new(StubGateway::new());
    let driver = SwarmDriver::with_gateway(gateway.clone());

    let state = driver.run(initial_state()).await.unwrap();

    assert_eq!(state.progress_log(), markers(&PhaseKind::ALL).as_slice());
    assert_eq!(state.claim_id().as_str(), "c1");
    assert_eq!(state.target_id(), 42);
    assert!(state.evidence().is_empty());
    assert!(state.promise_findings().is_empty());

    let expected: Vec<LegalFinding> = serde_json::from_value(legal_findings()).unwrap();
    assert_eq!(state.legal_findings(), expected.as_slice());
    assert_eq!(state.letter().unwrap().subject, "Letter Before Action: Vapor Game");
    assert_eq!(state.filing_packet().unwrap().required_user_actions.len(), 2);

    // Collection and extraction make no calls without evidence
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_full_run_with_collected_evidence() {
    let gateway = Arc::new(StubGateway::new());
    let driver = SwarmDriver::new(gateway.clone(), Arc::new(RoadmapCollector));

    let state = driver.run(initial_state()).await.unwrap();

    assert_eq!(state.progress_log().len(), 5);
    assert_eq!(state.evidence()[0].evidence_id, "ev-1");
    assert_eq!(state.promise_findings()[0].source_evidence_id, "ev-1");
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_legal_mapping_failure_halts_run() {
    let gateway = Arc::new(StubGateway::failing_on(LEGAL_MAPPING_INSTRUCTION));
    let driver = SwarmDriver::with_gateway(gateway.clone());

    let failure = driver.run(initial_state()).await.unwrap_err();

    assert_eq!(failure.phase, PhaseKind::MapToLegalFindings);
    match &failure.error {
        PhaseError::Gateway(e) => assert_eq!(e.category(), ErrorCategory::Transport),
        other => panic!("expected gateway error, got {:?}", other),
    }
    assert_eq!(
        failure.state.progress_log(),
        markers(&[PhaseKind::CollectEvidence, PhaseKind::ExtractPromises]).as_slice()
    );
    assert!(failure.state.legal_findings().is_empty());
    assert!(failure.state.letter().is_none());
    assert!(failure.state.filing_packet().is_none());
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_letter_failure_keeps_legal_findings() {
    let driver = SwarmDriver::with_gateway(Arc::new(StubGateway::failing_on(LETTER_DRAFTING_INSTRUCTION)));

    let failure = driver.run(initial_state()).await.unwrap_err();

    assert_eq!(failure.phase, PhaseKind::DraftLetter);
    assert_eq!(failure.state.progress_log().len(), 3);
    assert_eq!(failure.state.legal_findings().len(), 2);
    assert!(failure.state.letter().is_none());
}

#[tokio::test]
async fn test_final_state_survives_wire_roundtrip() {
    let driver = SwarmDriver::with_gateway(Arc::new(StubGateway::new()));
    let state = driver.run(initial_state()).await.unwrap();

    let wire = serde_json::to_string(&state).unwrap();
    assert!(wire.contains("\"filingPacket\""));
    let parsed: SwarmState = serde_json::from_str(&wire).unwrap();
    assert_eq!(parsed, state);
}
