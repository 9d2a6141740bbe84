//! Live progress records for assessments, the single source of truth for polling clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    Assessment, AssessmentId, AssessmentResult, AssessmentStatus, CompanyId, DocumentId,
};

/// Highest progress value a record may report before its result is attached.
pub const MAX_PENDING_PROGRESS: u8 = 99;

/// Outcome of a progress write, mostly useful for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    Applied,
    Stale,
    AlreadyCompleted,
    UnknownAssessment,
}

/// In-memory ledger shared between the request path and assessment workers.
///
/// Every write happens under one lock, so readers only ever observe whole snapshots.
#[derive(Debug, Default, Clone)]
pub struct ProgressLedger {
    records: Arc<Mutex<HashMap<AssessmentId, Assessment>>>,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a queued assessment at 0%.
    pub fn create(
        &self,
        id: AssessmentId,
        company_id: CompanyId,
        document_ids: Vec<DocumentId>,
    ) -> Assessment {
        let assessment = Assessment {
            id: id.clone(),
            company_id,
            document_ids,
            status: AssessmentStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            result: None,
        };

        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        guard.insert(id, assessment.clone());
        assessment
    }

    /// Records a progress signal. Values are clamped to 0-99 because only [`Self::complete`]
    /// may attach a result, and lower values than already recorded are ignored.
    pub fn update_progress(&self, id: &AssessmentId, progress: i64, status_text: &str) -> ProgressUpdate {
        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        let Some(record) = guard.get_mut(id) else {
            warn!(assessment_id = %id, progress, "progress update for unknown assessment ignored");
            return ProgressUpdate::UnknownAssessment;
        };

        if record.is_completed() {
            debug!(assessment_id = %id, progress, "progress update after completion ignored");
            return ProgressUpdate::AlreadyCompleted;
        }

        let clamped = progress.clamp(0, i64::from(MAX_PENDING_PROGRESS)) as u8;
        if clamped < record.progress {
            debug!(
                assessment_id = %id,
                progress = clamped,
                current = record.progress,
                "stale progress update ignored"
            );
            return ProgressUpdate::Stale;
        }

        record.progress = clamped;
        record.status = AssessmentStatus::Processing;
        record.message = status_text.to_string();
        info!(assessment_id = %id, progress = clamped, status = status_text, "assessment progress");
        ProgressUpdate::Applied
    }

    /// Attaches the final result and moves the record to `completed` at 100%.
    ///
    /// Returns `None` when the id is unknown or the record already holds a result.
    pub fn complete(&self, id: &AssessmentId, result: AssessmentResult) -> Option<Assessment> {
        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        let record = guard.get_mut(id)?;
        if record.result.is_some() {
            warn!(assessment_id = %id, "assessment already holds a result; completion ignored");
            return None;
        }

        record.result = Some(result);
        record.status = AssessmentStatus::Completed;
        record.progress = 100;
        record.message = "Assessment complete".to_string();
        record.completed_at = Some(Utc::now());
        Some(record.clone())
    }

    pub fn get(&self, id: &AssessmentId) -> Option<Assessment> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        guard.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("ledger mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
