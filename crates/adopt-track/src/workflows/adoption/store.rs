//! Trait seams between the workflow services and their collaborators:
//! persistent storage, the notification/audit event stream, and the
//! key-value settings service.

use chrono::NaiveDate;

use super::domain::{
    Agreement, AgreementId, Animal, AnimalId, Application, ApplicationId, ApplicationStatus,
    DocumentRef, Interview, InterviewId, PostAdoptionReport, ReportCadence, ReportId,
    WorkflowEvent,
};
use super::error::WorkflowError;

/// Storage abstraction for the adoption workflow.
///
/// Contract every implementation must honor, because the services rely on
/// it instead of check-then-act logic:
///
/// - `insert_application` rejects with `Conflict` when a live application
///   (submitted, under review, or approved without a confirmed agreement)
///   already exists for the same candidate/animal pair, atomically.
/// - `insert_interview` rejects with `Conflict` while another scheduled or
///   confirmed interview exists for the application.
/// - `insert_agreement` rejects with `Conflict` when the application
///   already has an agreement (1:1 binding).
/// - Every `update_*` compares the caller's snapshot `version` against the
///   stored one and rejects stale writes with `Conflict`, storing the new
///   state with the version bumped. This is the optimistic check that keeps
///   a stale client from confirming an agreement or completing an
///   interview that was concurrently cancelled.
pub trait AdoptionStore: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, WorkflowError>;
    fn update_application(&self, application: Application) -> Result<Application, WorkflowError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, WorkflowError>;
    fn applications_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, WorkflowError>;

    fn insert_interview(&self, interview: Interview) -> Result<Interview, WorkflowError>;
    fn update_interview(&self, interview: Interview) -> Result<Interview, WorkflowError>;
    fn fetch_interview(&self, id: &InterviewId) -> Result<Option<Interview>, WorkflowError>;
    fn interviews_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Interview>, WorkflowError>;

    fn insert_agreement(&self, agreement: Agreement) -> Result<Agreement, WorkflowError>;
    fn update_agreement(&self, agreement: Agreement) -> Result<Agreement, WorkflowError>;
    fn fetch_agreement(&self, id: &AgreementId) -> Result<Option<Agreement>, WorkflowError>;
    fn agreement_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Agreement>, WorkflowError>;

    fn insert_report(
        &self,
        report: PostAdoptionReport,
    ) -> Result<PostAdoptionReport, WorkflowError>;
    fn update_report(
        &self,
        report: PostAdoptionReport,
    ) -> Result<PostAdoptionReport, WorkflowError>;
    fn fetch_report(&self, id: &ReportId) -> Result<Option<PostAdoptionReport>, WorkflowError>;
    fn reports_by_agreement(
        &self,
        agreement_id: &AgreementId,
    ) -> Result<Vec<PostAdoptionReport>, WorkflowError>;
    /// Stored-pending reports whose due date lies strictly before `today`,
    /// feeding the overdue reconciliation sweep.
    fn pending_reports_due_before(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<PostAdoptionReport>, WorkflowError>;

    fn insert_animal(&self, animal: Animal) -> Result<Animal, WorkflowError>;
    fn update_animal(&self, animal: Animal) -> Result<Animal, WorkflowError>;
    fn fetch_animal(&self, id: &AnimalId) -> Result<Option<Animal>, WorkflowError>;
}

/// Outbound transition events for the notification and audit collaborators.
/// Delivery is fire-and-forget: publish failures are logged by the services
/// and never fail the transition that produced them.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &WorkflowEvent) -> Result<(), EventError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Key-value settings collaborator. The report cadence entirely defines the
/// recurring schedule; the template ref backs agreement template downloads.
pub trait SettingsProvider: Send + Sync {
    fn report_cadence(&self) -> ReportCadence;
    fn agreement_template(&self) -> DocumentRef;
}
