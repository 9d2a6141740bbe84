use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;

use super::analyzer::Analyzer;
use super::domain::{AssessmentId, CompanyId};
use super::lifecycle::{AssessmentError, AssessmentSubmission};
use super::registry::{CompanyDraft, DocumentDraft, FacilityDraft, RegistryError};
use super::service::AssessmentService;

/// Router exposing company intake, assessment submission, and polling endpoints.
pub fn assessment_router<A>(service: Arc<AssessmentService<A>>) -> Router
where
    A: Analyzer + 'static,
{
    Router::new()
        .route("/api/company", post(create_company_handler::<A>))
        .route("/api/company/:company_id", get(company_handler::<A>))
        .route("/api/facility", post(create_facility_handler::<A>))
        .route(
            "/api/facility/company/:company_id",
            get(facilities_handler::<A>),
        )
        .route("/api/document", post(register_document_handler::<A>))
        .route(
            "/api/document/company/:company_id",
            get(documents_handler::<A>),
        )
        .route("/api/assessment/start", post(start_handler::<A>))
        .route("/api/assessment/:assessment_id/status", get(status_handler::<A>))
        .route(
            "/api/assessment/:assessment_id/results",
            get(results_handler::<A>),
        )
        .route("/api/assessment/:assessment_id/report", get(report_handler::<A>))
        .with_state(service)
}

impl AssessmentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AssessmentError::Validation(_) => StatusCode::BAD_REQUEST,
            AssessmentError::NotFound { .. } => StatusCode::NOT_FOUND,
            AssessmentError::NotReady(_) => StatusCode::CONFLICT,
            AssessmentError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AssessmentError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.to_string() });
        (self.status_code(), Json(payload)).into_response()
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        AssessmentError::from(self).into_response()
    }
}

pub(crate) async fn create_company_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Json(draft): Json<CompanyDraft>,
) -> Response
where
    A: Analyzer + 'static,
{
    match service.registry().create_company(draft) {
        Ok(company) => (StatusCode::CREATED, Json(company)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn company_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Path(company_id): Path<String>,
) -> Response
where
    A: Analyzer + 'static,
{
    match service.registry().company(&CompanyId(company_id)) {
        Ok(company) => Json(company).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_facility_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Json(draft): Json<FacilityDraft>,
) -> Response
where
    A: Analyzer + 'static,
{
    match service.registry().create_facility(draft) {
        Ok(facility) => (StatusCode::CREATED, Json(facility)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn facilities_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Path(company_id): Path<String>,
) -> Response
where
    A: Analyzer + 'static,
{
    Json(service.registry().facilities_for(&CompanyId(company_id))).into_response()
}

pub(crate) async fn register_document_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Json(draft): Json<DocumentDraft>,
) -> Response
where
    A: Analyzer + 'static,
{
    match service.registry().register_document(draft) {
        Ok(document) => (StatusCode::CREATED, Json(document)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn documents_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Path(company_id): Path<String>,
) -> Response
where
    A: Analyzer + 'static,
{
    Json(service.registry().documents_for(&CompanyId(company_id))).into_response()
}

pub(crate) async fn start_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Json(submission): Json<AssessmentSubmission>,
) -> Response
where
    A: Analyzer + 'static,
{
    match service.submit(submission) {
        Ok(submitted) => {
            info!(assessment_id = %submitted.assessment.id, "assessment accepted");
            let payload = json!({ "assessmentId": submitted.assessment.id });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    A: Analyzer + 'static,
{
    match service.status(&AssessmentId(assessment_id)) {
        Ok(view) => Json(view).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn results_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    A: Analyzer + 'static,
{
    match service.results(&AssessmentId(assessment_id)) {
        Ok(result) => Json(result).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn report_handler<A>(
    State(service): State<Arc<AssessmentService<A>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    A: Analyzer + 'static,
{
    let report = match service.report(&AssessmentId(assessment_id)).await {
        Ok(report) => report,
        Err(err) => return err.into_response(),
    };

    let disposition = format!("attachment; filename=\"{}\"", report.file_name);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.content.as_ref().clone(),
    )
        .into_response()
}
