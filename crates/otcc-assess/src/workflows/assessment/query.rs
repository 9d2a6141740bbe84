use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use super::domain::{Assessment, AssessmentId, AssessmentResult, AssessmentStatusView};
use super::ledger::ProgressLedger;
use super::lifecycle::AssessmentError;
use super::workspace::{report_file_name, AssessmentWorkspace};

/// Downloadable report artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentReport {
    pub file_name: String,
    pub content: Arc<Vec<u8>>,
}

/// Read-only projection over the ledger for polling clients.
#[derive(Debug, Clone)]
pub struct AssessmentQueryService {
    ledger: ProgressLedger,
    workspace: AssessmentWorkspace,
    reports: Arc<Mutex<HashMap<AssessmentId, Arc<Vec<u8>>>>>,
}

impl AssessmentQueryService {
    pub fn new(ledger: ProgressLedger, workspace: AssessmentWorkspace) -> Self {
        Self {
            ledger,
            workspace,
            reports: Arc::default(),
        }
    }

    pub fn get_status(&self, id: &AssessmentId) -> Result<AssessmentStatusView, AssessmentError> {
        self.assessment(id).map(|assessment| assessment.status_view())
    }

    pub fn get_results(&self, id: &AssessmentId) -> Result<AssessmentResult, AssessmentError> {
        let assessment = self.assessment(id)?;
        completed_result(assessment)
    }

    /// Serializes the result on first request; later requests reuse the cached artifact.
    pub async fn get_report(&self, id: &AssessmentId) -> Result<AssessmentReport, AssessmentError> {
        let result = self.get_results(id)?;
        let file_name = report_file_name(id);

        if let Some(content) = self.cached(id) {
            debug!(assessment_id = %id, "serving cached report");
            return Ok(AssessmentReport { file_name, content });
        }

        let bytes = self
            .workspace
            .materialize_report(id, &result)
            .await
            .map_err(|err| {
                error!(assessment_id = %id, error = %err, "report materialization failed");
                AssessmentError::Report(err.to_string())
            })?;

        let content = {
            let mut reports = self.reports.lock().expect("report cache mutex poisoned");
            Arc::clone(reports.entry(id.clone()).or_insert_with(|| Arc::new(bytes)))
        };
        Ok(AssessmentReport { file_name, content })
    }

    fn cached(&self, id: &AssessmentId) -> Option<Arc<Vec<u8>>> {
        let reports = self.reports.lock().expect("report cache mutex poisoned");
        reports.get(id).cloned()
    }

    fn assessment(&self, id: &AssessmentId) -> Result<Assessment, AssessmentError> {
        self.ledger
            .get(id)
            .ok_or_else(|| AssessmentError::assessment_not_found(id))
    }
}

fn completed_result(assessment: Assessment) -> Result<AssessmentResult, AssessmentError> {
    if !assessment.is_completed() {
        return Err(AssessmentError::NotReady(assessment.id));
    }
    assessment
        .result
        .ok_or(AssessmentError::NotReady(assessment.id))
}
