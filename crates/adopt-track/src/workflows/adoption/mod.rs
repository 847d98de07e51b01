//! Adoption lifecycle orchestration.
//!
//! One coordinated state machine spans four entities: an [`Application`]
//! submitted by a candidate, the [`Interview`]s tied to it, the
//! [`Agreement`] that may be issued once every guard holds, and the chain
//! of [`PostAdoptionReport`]s bootstrapped when the agreement is
//! confirmed. Each transition is an atomic read-validate-write against the
//! [`store::AdoptionStore`] seam and emits a [`WorkflowEvent`] for the
//! notification and audit collaborators.

pub mod applications;
mod agreements;
pub mod domain;
mod error;
pub mod guards;
mod interviews;
mod reports;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use applications::{ApplicationDecision, ApplicationDraft};
pub use domain::{
    Actor, ActorId, Agreement, AgreementId, AgreementStatus, Animal, AnimalId, AnimalStatus,
    Application, ApplicationId, ApplicationStatus, DocumentRef, Interview, InterviewId,
    InterviewOutcome, InterviewStatus, PostAdoptionReport, ReportCadence, ReportId, ReportStatus,
    ReportView, Role, WorkflowEntity, WorkflowEvent,
};
pub use error::WorkflowError;
pub use guards::{can_issue_agreement, issuance_blockers, IssuanceGuard};
pub use reports::ReportSubmission;
pub use router::adoption_router;
pub use service::{AdoptionWorkflowService, SYSTEM_ACTOR_ID};
pub use store::{AdoptionStore, EventError, EventPublisher, SettingsProvider};
