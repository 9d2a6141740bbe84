//! Assessment orchestration: submission, external analysis, progress tracking, and the
//! guaranteed terminal result served to polling clients.

pub mod analyzer;
pub mod domain;
pub mod fallback;
pub mod ledger;
pub mod lifecycle;
pub mod query;
pub mod registry;
pub mod router;
pub mod service;
pub mod subprocess;
pub mod workspace;

#[cfg(test)]
mod tests;

pub use analyzer::{AnalysisError, AnalysisRequest, Analyzer, ProgressEvent, ProgressSender};
pub use domain::{
    Assessment, AssessmentId, AssessmentResult, AssessmentStatus, AssessmentStatusView,
    CompanyId, ComplianceStatus, Document, DocumentCategory, DocumentId, DomainScore, Effort,
    FacilityId, Finding, Impact, Recommendation,
};
pub use fallback::FallbackGenerator;
pub use ledger::{ProgressLedger, ProgressUpdate};
pub use lifecycle::{
    AssessmentError, AssessmentLifecycle, AssessmentSubmission, DocumentRef, SubmittedAssessment,
};
pub use query::{AssessmentQueryService, AssessmentReport};
pub use registry::{
    Company, CompanyDraft, CompanyRegistry, DocumentDraft, Facility, FacilityDraft, RegistryError,
};
pub use router::assessment_router;
pub use service::AssessmentService;
pub use subprocess::SubprocessAnalyzer;
pub use workspace::{AssessmentWorkspace, Manifest, ManifestEntry};
