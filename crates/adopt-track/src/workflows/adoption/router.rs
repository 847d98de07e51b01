//! HTTP surface for the adoption workflow.
//!
//! Identity arrives from the auth collaborator as `x-actor-id` /
//! `x-actor-role` headers; the same role checks run inside the service
//! regardless of transport, so the extractor is a convenience, not the
//! security boundary.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::applications::{ApplicationDecision, ApplicationDraft};
use super::domain::{
    Actor, ActorId, Agreement, AgreementId, AnimalId, ApplicationId, ApplicationStatus,
    DocumentRef, InterviewId, InterviewOutcome, ReportId, Role,
};
use super::error::WorkflowError;
use super::service::AdoptionWorkflowService;
use super::store::{AdoptionStore, EventPublisher, SettingsProvider};

type SharedService<S, E, P> = Arc<AdoptionWorkflowService<S, E, P>>;

/// Router builder exposing the adoption lifecycle endpoints.
pub fn adoption_router<S, E, P>(service: SharedService<S, E, P>) -> Router
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/adoption/applications",
            post(submit_application_handler::<S, E, P>).get(list_applications_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id",
            get(get_application_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id/decision",
            post(decide_application_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id/cancel",
            post(cancel_application_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id/passport",
            post(attach_passport_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id/interviews",
            post(schedule_interview_handler::<S, E, P>)
                .get(list_interviews_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/interviews/:interview_id/confirm",
            post(confirm_interview_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/interviews/:interview_id/decline",
            post(decline_interview_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/interviews/:interview_id/complete",
            post(complete_interview_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/interviews/:interview_id/cancel",
            post(cancel_interview_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/agreements",
            post(create_agreement_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/agreements/:agreement_id",
            get(get_agreement_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/agreements/:agreement_id/signed",
            post(upload_signed_handler::<S, E, P>).get(download_signed_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/agreements/:agreement_id/confirm",
            post(confirm_agreement_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/agreements/:agreement_id/template",
            get(download_template_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/agreements/:agreement_id/reports",
            get(list_reports_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/reports/:report_id",
            get(get_report_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/reports/:report_id/submit",
            post(submit_report_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/reports/:report_id/review",
            post(review_report_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/animals/:animal_id/ready",
            post(mark_animal_ready_handler::<S, E, P>),
        )
        .with_state(service)
}

#[async_trait]
impl<St> FromRequestParts<St> for Actor
where
    St: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header("x-actor-id").ok_or_else(|| {
            unauthorized("the x-actor-id header is required")
        })?;
        let role = header("x-actor-role")
            .and_then(Role::parse)
            .ok_or_else(|| unauthorized("the x-actor-role header must name a known role"))?;

        Ok(Actor {
            id: ActorId(id.to_string()),
            role,
        })
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": message })),
    )
        .into_response()
}

fn error_response(err: WorkflowError) -> Response {
    let (status, body) = match &err {
        WorkflowError::Validation(details) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": err.to_string(), "details": details }),
        ),
        WorkflowError::Guard { failing } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "error": err.to_string(),
                "failing_guards": failing.iter().map(|g| g.label()).collect::<Vec<_>>(),
            }),
        ),
        WorkflowError::InvalidTransition { .. } | WorkflowError::Conflict(_) => {
            (StatusCode::CONFLICT, json!({ "error": err.to_string() }))
        }
        WorkflowError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, json!({ "error": err.to_string() }))
        }
        WorkflowError::Forbidden { .. } => {
            (StatusCode::FORBIDDEN, json!({ "error": err.to_string() }))
        }
    };
    (status, Json(body)).into_response()
}

fn ok<T: Serialize>(value: T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

fn created<T: Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}

/// Agreement read model with the derived lifecycle status applied.
#[derive(Debug, Serialize)]
struct AgreementView {
    id: AgreementId,
    application_id: ApplicationId,
    coordinator_id: ActorId,
    status: &'static str,
    post_adoption_plan: String,
    signed_document: Option<DocumentRef>,
    signed_date: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl From<Agreement> for AgreementView {
    fn from(agreement: Agreement) -> Self {
        let status = agreement.status().label();
        Self {
            id: agreement.id,
            application_id: agreement.application_id,
            coordinator_id: agreement.coordinator_id,
            status,
            post_adoption_plan: agreement.post_adoption_plan,
            signed_document: agreement.signed_document,
            signed_date: agreement.signed_date,
            confirmed_at: agreement.confirmed_at,
            version: agreement.version,
        }
    }
}

// ----- applications -----

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitApplicationRequest {
    animal_id: String,
    reason: String,
    experience: String,
    housing: String,
    #[serde(default)]
    passport_document: Option<String>,
}

pub(crate) async fn submit_application_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Json(payload): Json<SubmitApplicationRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    let draft = ApplicationDraft {
        animal_id: AnimalId(payload.animal_id),
        reason: payload.reason,
        experience: payload.experience,
        housing: payload.housing,
        passport_document: payload.passport_document.map(DocumentRef),
    };
    match service.submit_application(&actor, draft, Utc::now()) {
        Ok(application) => created(application),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusQuery {
    status: String,
}

pub(crate) async fn list_applications_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Query(query): Query<StatusQuery>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    let Some(status) = ApplicationStatus::parse(&query.status) else {
        return error_response(WorkflowError::Validation(vec![format!(
            "unknown application status '{}'",
            query.status
        )]));
    };
    match service.applications_by_status(&actor, status) {
        Ok(applications) => ok(applications),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_application_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.application(&actor, &ApplicationId(application_id)) {
        Ok(application) => ok(application),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    decision: ApplicationDecision,
    comment: String,
}

pub(crate) async fn decide_application_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(payload): Json<DecisionRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.decide_application(
        &actor,
        &ApplicationId(application_id),
        payload.decision,
        &payload.comment,
        Utc::now(),
    ) {
        Ok(application) => ok(application),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CancelRequest {
    reason: String,
}

pub(crate) async fn cancel_application_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(payload): Json<CancelRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.cancel_application(
        &actor,
        &ApplicationId(application_id),
        &payload.reason,
        Utc::now(),
    ) {
        Ok(application) => ok(application),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PassportRequest {
    document: String,
}

pub(crate) async fn attach_passport_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(payload): Json<PassportRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.attach_passport(
        &actor,
        &ApplicationId(application_id),
        DocumentRef(payload.document),
    ) {
        Ok(application) => ok(application),
        Err(err) => error_response(err),
    }
}

// ----- interviews -----

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleInterviewRequest {
    /// RFC 3339 timestamp with an explicit offset, e.g.
    /// `2024-01-05T10:00:00+03:00`. Stored as UTC.
    scheduled_at: DateTime<FixedOffset>,
}

pub(crate) async fn schedule_interview_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(payload): Json<ScheduleInterviewRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.schedule_interview(
        &actor,
        &ApplicationId(application_id),
        payload.scheduled_at,
        Utc::now(),
    ) {
        Ok(interview) => created(interview),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_interviews_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.interviews_for_application(&actor, &ApplicationId(application_id)) {
        Ok(interviews) => ok(interviews),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn confirm_interview_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(interview_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.confirm_interview(&actor, &InterviewId(interview_id), Utc::now()) {
        Ok(interview) => ok(interview),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decline_interview_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(interview_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.decline_interview(&actor, &InterviewId(interview_id), Utc::now()) {
        Ok(interview) => ok(interview),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteInterviewRequest {
    outcome: InterviewOutcome,
    notes: String,
}

pub(crate) async fn complete_interview_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(interview_id): Path<String>,
    Json(payload): Json<CompleteInterviewRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.complete_interview(
        &actor,
        &InterviewId(interview_id),
        payload.outcome,
        &payload.notes,
        Utc::now(),
    ) {
        Ok(interview) => ok(interview),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_interview_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(interview_id): Path<String>,
    Json(payload): Json<CancelRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.cancel_interview(
        &actor,
        &InterviewId(interview_id),
        &payload.reason,
        Utc::now(),
    ) {
        Ok(interview) => ok(interview),
        Err(err) => error_response(err),
    }
}

// ----- agreements -----

#[derive(Debug, Deserialize)]
pub(crate) struct CreateAgreementRequest {
    application_id: String,
    plan: String,
}

pub(crate) async fn create_agreement_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Json(payload): Json<CreateAgreementRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.create_agreement(
        &actor,
        &ApplicationId(payload.application_id),
        &payload.plan,
        Utc::now(),
    ) {
        Ok(agreement) => created(AgreementView::from(agreement)),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_agreement_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(agreement_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.agreement(&actor, &AgreementId(agreement_id)) {
        Ok(agreement) => ok(AgreementView::from(agreement)),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignedUploadRequest {
    document: String,
}

pub(crate) async fn upload_signed_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(agreement_id): Path<String>,
    Json(payload): Json<SignedUploadRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.upload_signed_agreement(
        &actor,
        &AgreementId(agreement_id),
        DocumentRef(payload.document),
        Utc::now(),
    ) {
        Ok(agreement) => ok(AgreementView::from(agreement)),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct ConfirmAgreementRequest {
    #[serde(default)]
    confirmed_date: Option<DateTime<Utc>>,
}

pub(crate) async fn confirm_agreement_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(agreement_id): Path<String>,
    Json(payload): Json<ConfirmAgreementRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    let confirmed_date = payload.confirmed_date.unwrap_or_else(Utc::now);
    match service.confirm_agreement(&actor, &AgreementId(agreement_id), confirmed_date) {
        Ok(agreement) => ok(AgreementView::from(agreement)),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn download_template_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    _actor: Actor,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    ok(json!({ "document": service.agreement_template() }))
}

pub(crate) async fn download_signed_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(agreement_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.signed_agreement_document(&actor, &AgreementId(agreement_id)) {
        Ok(document) => ok(json!({ "document": document })),
        Err(err) => error_response(err),
    }
}

// ----- reports -----

#[derive(Debug, Deserialize, Default)]
pub(crate) struct AsOfQuery {
    /// Read-time reference date for overdue classification; defaults to
    /// today (UTC).
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

impl AsOfQuery {
    fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

pub(crate) async fn list_reports_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(agreement_id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.reports_for_agreement(&actor, &AgreementId(agreement_id), query.today()) {
        Ok(reports) => ok(reports),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_report_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(report_id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.report(&actor, &ReportId(report_id), query.today()) {
        Ok(report) => ok(report),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitReportRequest {
    text: String,
    #[serde(default)]
    media: Vec<String>,
}

pub(crate) async fn submit_report_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(report_id): Path<String>,
    Json(payload): Json<SubmitReportRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    let media = payload.media.into_iter().map(DocumentRef).collect();
    match service.submit_report(&actor, &ReportId(report_id), &payload.text, media, Utc::now()) {
        Ok(submission) => ok(json!({
            "submitted": submission.submitted,
            "next": submission.next,
        })),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewReportRequest {
    feedback: String,
}

pub(crate) async fn review_report_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(report_id): Path<String>,
    Json(payload): Json<ReviewReportRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.review_report(&actor, &ReportId(report_id), &payload.feedback, Utc::now()) {
        Ok(report) => ok(report),
        Err(err) => error_response(err),
    }
}

// ----- animals -----

pub(crate) async fn mark_animal_ready_handler<S, E, P>(
    State(service): State<SharedService<S, E, P>>,
    actor: Actor,
    Path(animal_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    match service.mark_animal_ready(&actor, &AnimalId(animal_id), Utc::now()) {
        Ok(animal) => ok(animal),
        Err(err) => error_response(err),
    }
}
