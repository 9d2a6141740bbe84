use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::assessment::domain::AssessmentId;
use crate::workflows::assessment::router::assessment_router;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn company_intake_round_trips_profile_fields() {
    let (service, _, _dir) = build_service(ScriptedAnalyzer::succeeding(), TEST_TIMEOUT);
    let router = assessment_router(service);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/company",
            json!({ "name": "Eastern Grid Co", "sector": "Energy", "employees": 1200 }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["sector"], "Energy");
    let company_id = created["id"].as_str().expect("id").to_string();

    let response = router
        .clone()
        .oneshot(get(&format!("/api/company/{company_id}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["name"], "Eastern Grid Co");

    let response = router
        .oneshot(get("/api/company/unknown"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn document_registration_rejects_unsupported_media() {
    let (service, _, _dir) = build_service(ScriptedAnalyzer::succeeding(), TEST_TIMEOUT);
    let (company, _) = seed_company(&service);
    let router = assessment_router(service);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/document",
            json!({
                "companyId": company.id,
                "path": "uploads/payload.exe",
                "originalName": "payload.exe",
                "size": 1024,
                "mimetype": "application/x-msdownload",
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(get(&format!("/api/document/company/{}", company.id)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn facilities_are_listed_per_company() {
    let (service, _, _dir) = build_service(ScriptedAnalyzer::succeeding(), TEST_TIMEOUT);
    let (company, _) = seed_company(&service);
    let router = assessment_router(service);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/facility",
            json!({
                "companyId": company.id,
                "name": "Desalination Plant 3",
                "criticalityLevel": "High",
                "systems": "SCADA, PLC",
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(get(&format!("/api/facility/company/{}", company.id)))
        .await
        .expect("response");
    let facilities = read_json_body(response).await;
    assert_eq!(facilities[0]["name"], "Desalination Plant 3");
    assert_eq!(facilities[0]["systems"], "SCADA, PLC");
}

#[tokio::test]
async fn start_validates_before_creating_anything() {
    let (service, _, _dir) = build_service(ScriptedAnalyzer::succeeding(), TEST_TIMEOUT);
    let (company, _) = seed_company(&service);
    let router = assessment_router(service.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/assessment/start",
            json!({ "companyId": company.id, "documents": [] }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json_body(response).await["error"]
        .as_str()
        .is_some_and(|message| message.contains("document")));

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/assessment/start",
            json!({ "companyId": company.id, "documents": ["missing"] }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(service.ledger().is_empty());
}

#[tokio::test]
async fn assessment_can_be_polled_through_to_the_report() {
    let (service, _, _dir) = build_service(ScriptedAnalyzer::succeeding(), TEST_TIMEOUT);
    let (company, documents) = seed_company(&service);
    let router = assessment_router(service.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/assessment/start",
            json!({ "companyId": company.id, "documents": [documents[0].id, documents[1].id] }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = read_json_body(response).await["assessmentId"]
        .as_str()
        .expect("assessment id")
        .to_string();

    let response = router
        .clone()
        .oneshot(get(&format!("/api/assessment/{id}/results")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/assessment/{id}/status")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let status = read_json_body(response).await;
    assert!(status["progress"].as_u64().is_some_and(|value| value < 100));
    assert!(status["completedAt"].is_null());

    poll_until_completed(&service, &AssessmentId::from(id.as_str())).await;

    let response = router
        .clone()
        .oneshot(get(&format!("/api/assessment/{id}/results")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let results = read_json_body(response).await;
    assert_eq!(results["overallScore"], 72.5);
    assert_eq!(results["findings"][0]["controlId"], "2-3-1");

    let response = router
        .oneshot(get(&format!("/api/assessment/{id}/report")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"OTCC_Assessment_Report_{id}.json\"").as_str()
    );
    assert_eq!(read_json_body(response).await["overallScore"], 72.5);
}

#[tokio::test]
async fn unknown_assessment_routes_return_not_found() {
    let (service, _, _dir) = build_service(ScriptedAnalyzer::succeeding(), TEST_TIMEOUT);
    let router = assessment_router(service);

    for suffix in ["status", "results", "report"] {
        let response = router
            .clone()
            .oneshot(get(&format!("/api/assessment/ghost/{suffix}")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{suffix}");
    }
}
