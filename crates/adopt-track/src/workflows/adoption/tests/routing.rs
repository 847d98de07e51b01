use super::common::*;
use crate::workflows::adoption::domain::{AnimalId, DocumentRef};
use crate::workflows::adoption::router::adoption_router;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(service: std::sync::Arc<TestService>) -> Router {
    adoption_router(service)
}

fn request(method: Method, uri: &str, actor: Option<(&str, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    match body {
        Some(value) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

#[tokio::test]
async fn missing_identity_headers_read_unauthorized() {
    let (service, store, _) = build_service();
    store.seed_animal("animal-1", false);

    let response = router(service)
        .oneshot(request(
            Method::POST,
            "/api/v1/adoption/applications",
            None,
            Some(json!({
                "animal_id": "animal-1",
                "reason": "companion",
                "experience": "two dogs",
                "housing": "house",
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_role_reads_unauthorized() {
    let (service, _, _) = build_service();
    let response = router(service)
        .oneshot(request(
            Method::GET,
            "/api/v1/adoption/applications/apl-000001",
            Some(("someone", "janitor")),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn submit_and_fetch_round_trip() {
    let (service, store, _) = build_service();
    store.seed_animal("animal-1", false);
    let app = router(service);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/adoption/applications",
            Some(("cand-1", "candidate")),
            Some(json!({
                "animal_id": "animal-1",
                "reason": "our family wants a companion",
                "experience": "raised two shelter dogs",
                "housing": "house with a fenced yard",
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "submitted");
    let id = created["id"].as_str().expect("id present").to_string();

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/adoption/applications/{id}"),
            Some(("cand-1", "candidate")),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["id"], Value::String(id));
}

#[tokio::test]
async fn validation_failure_reads_unprocessable_with_details() {
    let (service, store, _) = build_service();
    store.seed_animal("animal-1", false);

    let response = router(service)
        .oneshot(request(
            Method::POST,
            "/api/v1/adoption/applications",
            Some(("cand-1", "candidate")),
            Some(json!({
                "animal_id": "animal-1",
                "reason": " ",
                "experience": "",
                "housing": "house",
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["details"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn guard_violation_reads_unprocessable_with_guard_labels() {
    let (service, store, _) = build_service();
    let application_id = approved_application(&service, &store, "animal-1");

    let response = router(service)
        .oneshot(request(
            Method::POST,
            "/api/v1/adoption/agreements",
            Some(("coord-1", "coordinator")),
            Some(json!({
                "application_id": application_id.0,
                "plan": "weekly photo",
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(
        body["failing_guards"],
        json!(["passport_on_file", "animal_ready"])
    );
}

#[tokio::test]
async fn duplicate_application_reads_conflict() {
    let (service, store, _) = build_service();
    store.seed_animal("animal-1", false);
    let app = router(service);
    let payload = json!({
        "animal_id": "animal-1",
        "reason": "our family wants a companion",
        "experience": "raised two shelter dogs",
        "housing": "house with a fenced yard",
    });

    let first = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/adoption/applications",
            Some(("cand-1", "candidate")),
            Some(payload.clone()),
        ))
        .await
        .expect("router responds");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(request(
            Method::POST,
            "/api/v1/adoption/applications",
            Some(("cand-1", "candidate")),
            Some(payload),
        ))
        .await
        .expect("router responds");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn candidate_listing_reads_forbidden() {
    let (service, _, _) = build_service();
    let response = router(service)
        .oneshot(request(
            Method::GET,
            "/api/v1/adoption/applications?status=submitted",
            Some(("cand-1", "candidate")),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_report_reads_not_found() {
    let (service, _, _) = build_service();
    let response = router(service)
        .oneshot(request(
            Method::GET,
            "/api/v1/adoption/reports/rep-999999",
            Some(("coord-1", "coordinator")),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_view_honors_the_as_of_query() {
    let (service, store, _) = build_service();
    let (_, _, report_id) = confirmed_agreement(&service, &store, "animal-1");
    let app = router(service);

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/adoption/reports/{}?as_of=2024-02-19", report_id.0),
            Some(("cand-1", "candidate")),
            None,
        ))
        .await
        .expect("router responds");
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/adoption/reports/{}?as_of=2024-02-20", report_id.0),
            Some(("cand-1", "candidate")),
            None,
        ))
        .await
        .expect("router responds");
    let body = body_json(response).await;
    assert_eq!(body["status"], "overdue");
    assert_eq!(body["fill_deadline"], "2024-02-26");
}

#[tokio::test]
async fn agreement_confirmation_over_http_accepts_an_explicit_date() {
    let (service, store, _) = build_service();
    let application_id = approved_application(&service, &store, "animal-1");
    service
        .attach_passport(
            &candidate(),
            &application_id,
            DocumentRef("docs/passport.pdf".to_string()),
        )
        .expect("passport attaches");
    service
        .mark_animal_ready(
            &veterinarian(),
            &AnimalId("animal-1".to_string()),
            ts(2024, 1, 10, 9),
        )
        .expect("vet certifies readiness");
    let agreement = service
        .create_agreement(
            &coordinator(),
            &application_id,
            "weekly photo",
            ts(2024, 1, 12, 9),
        )
        .expect("agreement creates");
    service
        .upload_signed_agreement(
            &candidate(),
            &agreement.id,
            DocumentRef("docs/agreement-signed.pdf".to_string()),
            ts(2024, 1, 15, 9),
        )
        .expect("signed upload succeeds");

    let app = router(service);
    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/adoption/agreements/{}/confirm", agreement.id.0),
            Some(("coord-1", "coordinator")),
            Some(json!({ "confirmed_date": "2024-01-20T12:00:00Z" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "confirmed");

    // Irreversible: a second confirmation conflicts.
    let response = app
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/adoption/agreements/{}/confirm", agreement.id.0),
            Some(("coord-1", "coordinator")),
            Some(json!({})),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn template_download_returns_the_settings_document() {
    let (service, _, _) = build_service();
    let response = router(service)
        .oneshot(request(
            Method::GET,
            "/api/v1/adoption/agreements/agr-000001/template",
            Some(("cand-1", "candidate")),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["document"], "templates/adoption-agreement.pdf");
}
