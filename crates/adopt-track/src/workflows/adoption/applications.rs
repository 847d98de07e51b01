//! Application registry: submission, decision, cancellation, uniqueness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Actor, AnimalId, Application, ApplicationId, ApplicationStatus, DocumentRef, WorkflowEntity,
    WorkflowEvent,
};
use super::error::WorkflowError;
use super::service::{next_application_id, AdoptionWorkflowService};
use super::store::{AdoptionStore, EventPublisher, SettingsProvider};

/// Candidate-supplied content of a new application. Narrative fields are
/// required; the passport document may follow later via
/// [`AdoptionWorkflowService::attach_passport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub animal_id: AnimalId,
    pub reason: String,
    pub experience: String,
    pub housing: String,
    pub passport_document: Option<DocumentRef>,
}

/// Outcome a coordinator records on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationDecision {
    Approved,
    Rejected,
}

impl ApplicationDecision {
    pub const fn status(self) -> ApplicationStatus {
        match self {
            ApplicationDecision::Approved => ApplicationStatus::Approved,
            ApplicationDecision::Rejected => ApplicationStatus::Rejected,
        }
    }
}

impl<S, E, P> AdoptionWorkflowService<S, E, P>
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    /// Candidate-only. Creates the application in `submitted`; the store
    /// enforces at most one live application per (candidate, animal) pair.
    pub fn submit_application(
        &self,
        actor: &Actor,
        draft: ApplicationDraft,
        now: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        self.require_candidate(actor, "submit an application")?;

        let mut missing = Vec::new();
        for (field, value) in [
            ("reason", &draft.reason),
            ("experience", &draft.experience),
            ("housing", &draft.housing),
        ] {
            if value.trim().is_empty() {
                missing.push(format!("{field} must not be empty"));
            }
        }
        if !missing.is_empty() {
            return Err(WorkflowError::Validation(missing));
        }

        // The animal must exist before an application can reference it.
        self.fetch_animal(&draft.animal_id)?;

        let application = Application {
            id: next_application_id(),
            candidate_id: actor.id.clone(),
            animal_id: draft.animal_id,
            status: ApplicationStatus::Submitted,
            reason: draft.reason,
            experience: draft.experience,
            housing: draft.housing,
            passport_document: draft.passport_document,
            decision_comment: None,
            created_at: now,
            version: 0,
        };

        let stored = self.store.insert_application(application)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Application,
            entity_id: stored.id.0.clone(),
            from_status: None,
            to_status: ApplicationStatus::Submitted.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    pub fn application(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<Application, WorkflowError> {
        let application = self.fetch_application(id)?;
        self.ensure_application_visible(actor, &application)?;
        Ok(application)
    }

    /// Coordinator-only status listing backing the review queue.
    pub fn applications_by_status(
        &self,
        actor: &Actor,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, WorkflowError> {
        self.require_coordinator(actor, "list applications")?;
        self.store.applications_by_status(status)
    }

    /// Coordinator-only. Requires a non-empty justification comment and a
    /// live application. Any in-flight interview is deliberately left
    /// untouched; reconciling the two tracks stays a coordinator call.
    pub fn decide_application(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        decision: ApplicationDecision,
        comment: &str,
        now: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        self.require_coordinator(actor, "decide an application")?;
        if comment.trim().is_empty() {
            return Err(WorkflowError::Validation(vec![
                "a decision comment is required".to_string(),
            ]));
        }

        let mut application = self.fetch_application(id)?;
        if !application.is_live(self.has_confirmed_agreement(id)?) {
            return Err(WorkflowError::InvalidTransition {
                entity: "application",
                id: id.0.clone(),
                state: application.status.label(),
                action: "decide",
            });
        }

        let from = application.status;
        application.status = decision.status();
        application.decision_comment = Some(comment.trim().to_string());
        let stored = self.store.update_application(application)?;

        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Application,
            entity_id: id.0.clone(),
            from_status: Some(from.label()),
            to_status: stored.status.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    /// Candidate (own application) or coordinator. Permitted until an
    /// agreement is confirmed; the reason lands in the decision comment.
    pub fn cancel_application(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        if !actor.is_coordinator() && !actor.is_candidate() {
            return Err(WorkflowError::Forbidden {
                role: actor.role.label(),
                action: "cancel an application",
            });
        }
        if reason.trim().is_empty() {
            return Err(WorkflowError::Validation(vec![
                "a cancellation reason is required".to_string(),
            ]));
        }

        let mut application = self.fetch_application(id)?;
        if actor.is_candidate() {
            self.ensure_application_visible(actor, &application)?;
        }

        if application.is_terminal_status() || self.has_confirmed_agreement(id)? {
            return Err(WorkflowError::InvalidTransition {
                entity: "application",
                id: id.0.clone(),
                state: application.status.label(),
                action: "cancel",
            });
        }

        let from = application.status;
        application.status = ApplicationStatus::Cancelled;
        application.decision_comment = Some(reason.trim().to_string());
        let stored = self.store.update_application(application)?;

        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Application,
            entity_id: id.0.clone(),
            from_status: Some(from.label()),
            to_status: ApplicationStatus::Cancelled.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    /// Candidate-only. Attaches the identity document after submission;
    /// allowed while the application is still live.
    pub fn attach_passport(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        document: DocumentRef,
    ) -> Result<Application, WorkflowError> {
        self.require_candidate(actor, "attach an identity document")?;

        let mut application = self.fetch_application(id)?;
        self.ensure_application_visible(actor, &application)?;

        if !application.is_live(self.has_confirmed_agreement(id)?) {
            return Err(WorkflowError::InvalidTransition {
                entity: "application",
                id: id.0.clone(),
                state: application.status.label(),
                action: "attach an identity document",
            });
        }

        application.passport_document = Some(document);
        self.store.update_application(application)
    }
}
