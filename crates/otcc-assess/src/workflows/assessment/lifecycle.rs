use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::analyzer::{AnalysisError, AnalysisRequest, Analyzer};
use super::domain::{Assessment, AssessmentId, AssessmentResult, CompanyId, Document, DocumentId};
use super::fallback::FallbackGenerator;
use super::ledger::ProgressLedger;
use super::registry::{CompanyRegistry, RegistryError};
use super::workspace::{AssessmentWorkspace, Manifest};

/// Progress recorded once the submission has been accepted and the manifest written.
pub const VALIDATED_PROGRESS: i64 = 10;

/// A document may be referenced by bare id or by any object carrying its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DocumentRef {
    Id(DocumentId),
    Descriptor { id: DocumentId },
}

impl DocumentRef {
    pub fn id(&self) -> &DocumentId {
        match self {
            Self::Id(id) | Self::Descriptor { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSubmission {
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

/// A freshly created assessment together with the task processing it.
#[derive(Debug)]
pub struct SubmittedAssessment {
    pub assessment: Assessment,
    pub worker: JoinHandle<()>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("{0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("assessment {0} is not completed yet")]
    NotReady(AssessmentId),
    #[error("report unavailable: {0}")]
    Report(String),
}

impl AssessmentError {
    pub(crate) fn assessment_not_found(id: &AssessmentId) -> Self {
        Self::NotFound {
            kind: "assessment",
            id: id.to_string(),
        }
    }
}

impl From<RegistryError> for AssessmentError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::Validation(message) => Self::Validation(message),
            RegistryError::NotFound { kind, id } => Self::NotFound { kind, id },
        }
    }
}

/// Owns the per-assessment state machine: queued -> processing -> completed.
///
/// Every accepted submission gets exactly one analyzer attempt, bounded by `timeout`. Any
/// analyzer failure is replaced by a fallback result so the record always completes.
pub struct AssessmentLifecycle<A> {
    ledger: ProgressLedger,
    registry: CompanyRegistry,
    workspace: AssessmentWorkspace,
    analyzer: Arc<A>,
    fallback: FallbackGenerator,
    timeout: Duration,
}

impl<A> AssessmentLifecycle<A>
where
    A: Analyzer + 'static,
{
    pub fn new(
        ledger: ProgressLedger,
        registry: CompanyRegistry,
        workspace: AssessmentWorkspace,
        analyzer: Arc<A>,
        timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            registry,
            workspace,
            analyzer,
            fallback: FallbackGenerator,
            timeout,
        }
    }

    /// Validates the submission, records it as queued, and starts processing in the
    /// background. Must be called from within a Tokio runtime.
    pub fn submit(
        &self,
        submission: AssessmentSubmission,
    ) -> Result<SubmittedAssessment, AssessmentError> {
        let (company_id, documents) = self.resolve(submission)?;

        let id = AssessmentId::generate();
        let document_ids = documents.iter().map(|document| document.id.clone()).collect();
        let assessment = self.ledger.create(id.clone(), company_id.clone(), document_ids);
        info!(
            assessment_id = %id,
            company_id = %company_id,
            documents = documents.len(),
            "assessment created"
        );

        let worker = AssessmentWorker {
            ledger: self.ledger.clone(),
            workspace: self.workspace.clone(),
            analyzer: Arc::clone(&self.analyzer),
            fallback: self.fallback,
            timeout: self.timeout,
        };
        let worker = tokio::spawn(worker.run(id, company_id, documents));

        Ok(SubmittedAssessment { assessment, worker })
    }

    fn resolve(
        &self,
        submission: AssessmentSubmission,
    ) -> Result<(CompanyId, Vec<Document>), AssessmentError> {
        let company_id = submission
            .company_id
            .filter(|id| !id.as_str().trim().is_empty())
            .ok_or_else(|| AssessmentError::Validation("companyId is required".to_string()))?;
        if submission.documents.is_empty() {
            return Err(AssessmentError::Validation(
                "at least one document is required".to_string(),
            ));
        }

        self.registry.company(&company_id)?;

        let mut seen = HashSet::new();
        let mut documents = Vec::with_capacity(submission.documents.len());
        for reference in &submission.documents {
            if !seen.insert(reference.id().clone()) {
                continue;
            }
            let document = self.registry.document(reference.id())?;
            if document.company_id != company_id {
                return Err(AssessmentError::Validation(format!(
                    "document {} does not belong to company {}",
                    document.id, company_id
                )));
            }
            documents.push(document);
        }

        Ok((company_id, documents))
    }
}

struct AssessmentWorker<A> {
    ledger: ProgressLedger,
    workspace: AssessmentWorkspace,
    analyzer: Arc<A>,
    fallback: FallbackGenerator,
    timeout: Duration,
}

impl<A> AssessmentWorker<A>
where
    A: Analyzer + 'static,
{
    async fn run(self, id: AssessmentId, company_id: CompanyId, documents: Vec<Document>) {
        for document in &documents {
            info!(
                assessment_id = %id,
                document = %document.original_name,
                category = document.category.label(),
                "document queued for analysis"
            );
        }

        let manifest = Manifest::new(id.clone(), company_id, &documents);
        let prepared = self.workspace.prepare(&manifest).await;
        self.ledger
            .update_progress(&id, VALIDATED_PROGRESS, "Documents validated");

        let outcome = match prepared {
            Ok(output_dir) => {
                let request = AnalysisRequest {
                    assessment_id: id.clone(),
                    document_paths: manifest.document_paths(),
                    output_dir,
                };
                self.analyze(request).await
            }
            Err(err) => Err(AnalysisError::Io(format!(
                "cannot prepare assessment directory: {err}"
            ))),
        };

        let (result, from_analyzer) = match outcome {
            Ok(result) => {
                metrics::counter!("otcc_assessments_completed_total", "source" => "analyzer")
                    .increment(1);
                info!(assessment_id = %id, score = result.overall_score, "analysis succeeded");
                (result, true)
            }
            Err(err) => {
                metrics::counter!("otcc_assessments_fallback_total", "reason" => err.kind())
                    .increment(1);
                metrics::counter!("otcc_assessments_completed_total", "source" => "fallback")
                    .increment(1);
                warn!(
                    assessment_id = %id,
                    reason = err.kind(),
                    error = %err,
                    "analysis failed; substituting fallback result"
                );
                (self.fallback_result(documents.len()), false)
            }
        };

        self.finalize(&id, result, from_analyzer).await;
    }

    async fn analyze(&self, request: AnalysisRequest) -> Result<AssessmentResult, AnalysisError> {
        let id = request.assessment_id.clone();
        let (progress, mut events) = mpsc::unbounded_channel();

        let run = tokio::time::timeout(self.timeout, self.analyzer.run(request, progress));
        tokio::pin!(run);

        let outcome = loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => {
                    self.ledger.update_progress(&id, event.progress, &event.status);
                }
                finished = &mut run => {
                    break finished.unwrap_or(Err(AnalysisError::Timeout));
                }
            }
        };

        while let Ok(event) = events.try_recv() {
            self.ledger
                .update_progress(&id, event.progress, &event.status);
        }

        outcome
    }

    fn fallback_result(&self, documents: usize) -> AssessmentResult {
        let mut result = self.fallback.generate();
        result.documents_analyzed = Some(u32::try_from(documents).unwrap_or(u32::MAX));
        result
    }

    /// Completes the ledger record. The analyzer's own `results.json` is left as written;
    /// only fallback results are persisted here.
    async fn finalize(&self, id: &AssessmentId, result: AssessmentResult, from_analyzer: bool) {
        if !from_analyzer {
            match self.workspace.write_results(id, &result).await {
                Ok(path) => info!(assessment_id = %id, path = %path.display(), "fallback results persisted"),
                Err(err) => error!(assessment_id = %id, error = %err, "failed to persist fallback results"),
            }
        }

        match self.ledger.complete(id, result) {
            Some(_) => info!(assessment_id = %id, "assessment completed"),
            None => error!(assessment_id = %id, "assessment could not be completed in the ledger"),
        }
    }
}
