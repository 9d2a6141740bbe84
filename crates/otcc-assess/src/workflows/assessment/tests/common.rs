use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{Map, Value};
use tempfile::TempDir;

use crate::workflows::assessment::analyzer::{
    AnalysisError, AnalysisRequest, Analyzer, ProgressEvent, ProgressSender,
};
use crate::workflows::assessment::domain::{
    AssessmentId, AssessmentResult, AssessmentStatus, DomainScore, Effort, Finding, Impact,
    Recommendation,
};
use crate::workflows::assessment::registry::{Company, CompanyDraft, DocumentDraft};
use crate::workflows::assessment::service::AssessmentService;
use crate::workflows::assessment::workspace::AssessmentWorkspace;
use crate::workflows::assessment::Document;

pub(super) const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) fn analyzer_result() -> AssessmentResult {
    AssessmentResult {
        overall_score: 72.5,
        domain_scores: vec![
            DomainScore {
                domain: "Cybersecurity Governance".to_string(),
                score: 80.0,
            },
            DomainScore {
                domain: "Cybersecurity Defense".to_string(),
                score: 65.0,
            },
            DomainScore {
                domain: "Cybersecurity Resilience".to_string(),
                score: 75.0,
            },
            DomainScore {
                domain: "Third-Party Cybersecurity".to_string(),
                score: 70.0,
            },
        ],
        findings: vec![Finding {
            control_id: "2-3-1".to_string(),
            domain: "Cybersecurity Defense".to_string(),
            subdomain: Some("Network Security Management".to_string()),
            issue: "Flat network between IT and OT zones".to_string(),
            impact: Impact::High,
            recommendation: "Introduce a DMZ between corporate and control networks".to_string(),
        }],
        recommendations: vec![Recommendation {
            title: "Segment the control network".to_string(),
            impact: Impact::High,
            effort: Effort::High,
            description: "Deploy industrial firewalls between Purdue levels 3 and 4".to_string(),
            compliance_improvement: 10,
            estimated_cost: None,
            time_to_implement: None,
        }],
        controls_assessed: Some(6),
        documents_analyzed: Some(3),
        compliance_status: None,
        assessment_date: None,
    }
}

/// Analyzer double that replays progress events and then resolves with a fixed outcome.
pub(super) struct ScriptedAnalyzer {
    events: Vec<(i64, &'static str)>,
    outcome: Result<AssessmentResult, AnalysisError>,
    step: Duration,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedAnalyzer {
    pub(super) fn succeeding() -> Self {
        Self::new(Ok(analyzer_result()))
    }

    pub(super) fn failing(error: AnalysisError) -> Self {
        Self::new(Err(error))
    }

    fn new(outcome: Result<AssessmentResult, AnalysisError>) -> Self {
        Self {
            events: vec![
                (23, "Analyzing document 1 of 3"),
                (46, "Analyzing document 2 of 3"),
                (70, "Analyzing document 3 of 3"),
                (80, "Generating assessment results"),
                (90, "Preparing recommendations"),
                (100, "Assessment complete"),
            ],
            outcome,
            step: Duration::from_millis(15),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn with_events(mut self, events: Vec<(i64, &'static str)>) -> Self {
        self.events = events;
        self
    }

    pub(super) fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn run(
        &self,
        request: AnalysisRequest,
        progress: ProgressSender,
    ) -> Result<AssessmentResult, AnalysisError> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(request);

        for (value, status) in &self.events {
            tokio::time::sleep(self.step).await;
            let _ = progress.send(ProgressEvent {
                progress: *value,
                status: (*status).to_string(),
            });
        }
        tokio::time::sleep(self.step).await;
        self.outcome.clone()
    }
}

/// Analyzer double that never returns.
pub(super) struct HangingAnalyzer;

#[async_trait]
impl Analyzer for HangingAnalyzer {
    async fn run(
        &self,
        _request: AnalysisRequest,
        progress: ProgressSender,
    ) -> Result<AssessmentResult, AnalysisError> {
        let _ = progress.send(ProgressEvent {
            progress: 30,
            status: "Analyzing document 1 of 3".to_string(),
        });
        std::future::pending().await
    }
}

pub(super) fn build_service<A>(
    analyzer: A,
    timeout: Duration,
) -> (Arc<AssessmentService<A>>, Arc<A>, TempDir)
where
    A: Analyzer + 'static,
{
    let dir = tempfile::tempdir().expect("temp dir");
    let analyzer = Arc::new(analyzer);
    let service = Arc::new(AssessmentService::new(
        analyzer.clone(),
        AssessmentWorkspace::new(dir.path().join("assessments")),
        timeout,
    ));
    (service, analyzer, dir)
}

pub(super) fn seed_company<A>(service: &AssessmentService<A>) -> (Company, Vec<Document>)
where
    A: Analyzer + 'static,
{
    let mut profile = Map::new();
    profile.insert("industry".to_string(), Value::from("Utilities"));
    let company = service
        .registry()
        .create_company(CompanyDraft {
            name: "Gulf Water Authority".to_string(),
            profile,
        })
        .expect("company created");

    let documents = [
        ("ot_security_policy.pdf", "application/pdf"),
        ("scada_architecture.png", "image/png"),
        ("meeting_notes.txt", "text/plain"),
    ]
    .into_iter()
    .map(|(name, mimetype)| {
        service
            .registry()
            .register_document(DocumentDraft {
                company_id: company.id.clone(),
                path: PathBuf::from("uploads").join(name),
                original_name: name.to_string(),
                size: 4096,
                mimetype: mimetype.to_string(),
                category: None,
            })
            .expect("document registered")
    })
    .collect();

    (company, documents)
}

/// Polls the status projection until completion, returning every observed progress value.
pub(super) async fn poll_until_completed<A>(
    service: &AssessmentService<A>,
    id: &AssessmentId,
) -> Vec<u8>
where
    A: Analyzer + 'static,
{
    let mut observed = Vec::new();
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    loop {
        let assessment = service.ledger().get(id).expect("assessment exists");
        assert_invariant(&assessment);
        observed.push(assessment.progress);
        if assessment.status == AssessmentStatus::Completed {
            return observed;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "assessment {id} did not complete, observed {observed:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub(super) fn assert_invariant(assessment: &crate::workflows::assessment::Assessment) {
    let completed = assessment.status == AssessmentStatus::Completed;
    assert_eq!(completed, assessment.result.is_some(), "{assessment:?}");
    assert_eq!(completed, assessment.progress == 100, "{assessment:?}");
    assert_eq!(completed, assessment.completed_at.is_some(), "{assessment:?}");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
