use std::sync::Arc;
use std::time::Duration;

use super::analyzer::Analyzer;
use super::domain::{AssessmentId, AssessmentResult, AssessmentStatusView};
use super::ledger::ProgressLedger;
use super::lifecycle::{AssessmentError, AssessmentLifecycle, AssessmentSubmission, SubmittedAssessment};
use super::query::{AssessmentQueryService, AssessmentReport};
use super::registry::CompanyRegistry;
use super::subprocess::SubprocessAnalyzer;
use super::workspace::AssessmentWorkspace;
use crate::config::AssessmentConfig;

/// Service composing the registry, lifecycle manager, and query projection over one
/// shared ledger. Created at process start and dropped at shutdown.
pub struct AssessmentService<A> {
    ledger: ProgressLedger,
    registry: CompanyRegistry,
    lifecycle: AssessmentLifecycle<A>,
    queries: AssessmentQueryService,
}

impl AssessmentService<SubprocessAnalyzer> {
    pub fn from_config(config: &AssessmentConfig) -> Self {
        let analyzer = SubprocessAnalyzer::new(
            config.analyzer_program.clone(),
            config.analyzer_args.clone(),
        );
        Self::new(
            Arc::new(analyzer),
            AssessmentWorkspace::new(config.assessment_dir.clone()),
            config.analyzer_timeout,
        )
    }
}

impl<A> AssessmentService<A>
where
    A: Analyzer + 'static,
{
    pub fn new(analyzer: Arc<A>, workspace: AssessmentWorkspace, timeout: Duration) -> Self {
        let ledger = ProgressLedger::new();
        let registry = CompanyRegistry::new();
        let lifecycle = AssessmentLifecycle::new(
            ledger.clone(),
            registry.clone(),
            workspace.clone(),
            analyzer,
            timeout,
        );
        let queries = AssessmentQueryService::new(ledger.clone(), workspace);

        Self {
            ledger,
            registry,
            lifecycle,
            queries,
        }
    }

    pub fn registry(&self) -> &CompanyRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn submit(
        &self,
        submission: AssessmentSubmission,
    ) -> Result<SubmittedAssessment, AssessmentError> {
        self.lifecycle.submit(submission)
    }

    pub fn status(&self, id: &AssessmentId) -> Result<AssessmentStatusView, AssessmentError> {
        self.queries.get_status(id)
    }

    pub fn results(&self, id: &AssessmentId) -> Result<AssessmentResult, AssessmentError> {
        self.queries.get_results(id)
    }

    pub async fn report(&self, id: &AssessmentId) -> Result<AssessmentReport, AssessmentError> {
        self.queries.get_report(id).await
    }
}
