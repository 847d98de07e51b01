use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::domain::{
    Actor, ActorId, Agreement, AgreementId, Animal, AnimalId, AnimalStatus, Application,
    ApplicationId, InterviewId, PostAdoptionReport, ReportId, WorkflowEntity, WorkflowEvent,
};
use super::error::WorkflowError;
use super::store::{AdoptionStore, EventPublisher, SettingsProvider};

/// Actor recorded on events produced by internal passes (the overdue sweep)
/// rather than a request.
pub const SYSTEM_ACTOR_ID: &str = "system";

/// Facade composing the application registry, interview scheduler, guard
/// evaluator, agreement issuer, and report scheduler over one store seam.
/// The component operations live in sibling modules as further `impl`
/// blocks on this type.
pub struct AdoptionWorkflowService<S, E, P> {
    pub(super) store: Arc<S>,
    pub(super) events: Arc<E>,
    pub(super) settings: Arc<P>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static INTERVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static AGREEMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REPORT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(super) fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("apl-{id:06}"))
}

pub(super) fn next_interview_id() -> InterviewId {
    let id = INTERVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InterviewId(format!("int-{id:06}"))
}

pub(super) fn next_agreement_id() -> AgreementId {
    let id = AGREEMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AgreementId(format!("agr-{id:06}"))
}

pub(super) fn next_report_id() -> ReportId {
    let id = REPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReportId(format!("rep-{id:06}"))
}

impl<S, E, P> AdoptionWorkflowService<S, E, P>
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    pub fn new(store: Arc<S>, events: Arc<E>, settings: Arc<P>) -> Self {
        Self {
            store,
            events,
            settings,
        }
    }

    /// Veterinarian-only: certify an animal as ready for adoption. The
    /// broader veterinary flow lives outside this core; the readiness flag
    /// is the one input the guard evaluator needs a writer for.
    pub fn mark_animal_ready(
        &self,
        actor: &Actor,
        animal_id: &AnimalId,
        now: DateTime<Utc>,
    ) -> Result<Animal, WorkflowError> {
        if !matches!(
            actor.role,
            super::domain::Role::Veterinarian | super::domain::Role::Admin
        ) {
            return Err(WorkflowError::Forbidden {
                role: actor.role.label(),
                action: "certify adoption readiness",
            });
        }

        let mut animal = self.fetch_animal(animal_id)?;
        if animal.status == AnimalStatus::Adopted {
            return Err(WorkflowError::InvalidTransition {
                entity: "animal",
                id: animal_id.0.clone(),
                state: AnimalStatus::Adopted.label(),
                action: "certify adoption readiness",
            });
        }

        animal.ready_for_adoption = true;
        let animal = self.store.update_animal(animal)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Animal,
            entity_id: animal_id.0.clone(),
            from_status: None,
            to_status: "ready_for_adoption",
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(animal)
    }

    // ----- shared plumbing for the component modules -----

    pub(super) fn emit(&self, event: WorkflowEvent) {
        if let Err(err) = self.events.publish(&event) {
            warn!(
                entity = event.entity.label(),
                entity_id = %event.entity_id,
                to_status = event.to_status,
                error = %err,
                "workflow event dropped"
            );
        }
    }

    pub(super) fn require_coordinator(
        &self,
        actor: &Actor,
        action: &'static str,
    ) -> Result<(), WorkflowError> {
        if actor.is_coordinator() {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden {
                role: actor.role.label(),
                action,
            })
        }
    }

    pub(super) fn require_candidate(
        &self,
        actor: &Actor,
        action: &'static str,
    ) -> Result<(), WorkflowError> {
        if actor.is_candidate() {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden {
                role: actor.role.label(),
                action,
            })
        }
    }

    pub(super) fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Application, WorkflowError> {
        self.store
            .fetch_application(id)?
            .ok_or_else(|| WorkflowError::not_found("application", id.0.clone()))
    }

    pub(super) fn fetch_agreement(&self, id: &AgreementId) -> Result<Agreement, WorkflowError> {
        self.store
            .fetch_agreement(id)?
            .ok_or_else(|| WorkflowError::not_found("agreement", id.0.clone()))
    }

    pub(super) fn fetch_report(&self, id: &ReportId) -> Result<PostAdoptionReport, WorkflowError> {
        self.store
            .fetch_report(id)?
            .ok_or_else(|| WorkflowError::not_found("report", id.0.clone()))
    }

    pub(super) fn fetch_animal(&self, id: &AnimalId) -> Result<Animal, WorkflowError> {
        self.store
            .fetch_animal(id)?
            .ok_or_else(|| WorkflowError::not_found("animal", id.0.clone()))
    }

    pub(super) fn has_confirmed_agreement(
        &self,
        application_id: &ApplicationId,
    ) -> Result<bool, WorkflowError> {
        Ok(self
            .store
            .agreement_by_application(application_id)?
            .map(|agreement| agreement.confirmed_at.is_some())
            .unwrap_or(false))
    }

    /// Candidates only see their own applications; staff see everything.
    /// Lack of visibility reads as `NotFound`, not `Forbidden`, so record
    /// existence is not leaked.
    pub(super) fn ensure_application_visible(
        &self,
        actor: &Actor,
        application: &Application,
    ) -> Result<(), WorkflowError> {
        if actor.is_staff() || application.candidate_id == actor.id {
            Ok(())
        } else {
            Err(WorkflowError::not_found(
                "application",
                application.id.0.clone(),
            ))
        }
    }

    pub(super) fn system_actor_id(&self) -> ActorId {
        ActorId(SYSTEM_ACTOR_ID.to_string())
    }
}
