//! Agreement issuance: the guarded draft → signed → confirmed lifecycle.
//!
//! Confirmation is the single irreversible transition in the whole
//! workflow. It flips the animal to adopted and bootstraps the
//! post-adoption reporting chain; nothing can unconfirm it afterwards.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::domain::{
    Actor, Agreement, AgreementId, AnimalStatus, ApplicationId, DocumentRef, PostAdoptionReport,
    ReportStatus, WorkflowEntity, WorkflowEvent,
};
use super::error::WorkflowError;
use super::guards::{issuance_blockers, IssuanceGuard};
use super::service::{next_agreement_id, next_report_id, AdoptionWorkflowService};
use super::store::{AdoptionStore, EventPublisher, SettingsProvider};

impl<S, E, P> AdoptionWorkflowService<S, E, P>
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    /// Coordinator-only. Runs the guard evaluator and reports the complete
    /// failing set; on success binds a draft agreement 1:1 to the
    /// application (duplicate creation fails `Conflict` in the store).
    pub fn create_agreement(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        plan: &str,
        now: DateTime<Utc>,
    ) -> Result<Agreement, WorkflowError> {
        self.require_coordinator(actor, "create an agreement")?;
        if plan.trim().is_empty() {
            return Err(WorkflowError::Validation(vec![
                "a post-adoption plan is required".to_string(),
            ]));
        }

        let application = self.fetch_application(application_id)?;
        let animal = self.fetch_animal(&application.animal_id)?;

        let failing = issuance_blockers(&application, &animal);
        if !failing.is_empty() {
            return Err(WorkflowError::Guard { failing });
        }

        let agreement = Agreement {
            id: next_agreement_id(),
            application_id: application_id.clone(),
            coordinator_id: actor.id.clone(),
            post_adoption_plan: plan.trim().to_string(),
            signed_document: None,
            signed_date: None,
            confirmed_at: None,
            created_at: now,
            version: 0,
        };
        let stored = self.store.insert_agreement(agreement)?;

        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Agreement,
            entity_id: stored.id.0.clone(),
            from_status: None,
            to_status: stored.status().label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    pub fn agreement(&self, actor: &Actor, id: &AgreementId) -> Result<Agreement, WorkflowError> {
        let agreement = self.fetch_agreement(id)?;
        let application = self.fetch_application(&agreement.application_id)?;
        self.ensure_application_visible(actor, &application)?;
        Ok(agreement)
    }

    /// Candidate-only (owner). Records the signed-document ref once; a
    /// second upload is an invalid transition.
    pub fn upload_signed_agreement(
        &self,
        actor: &Actor,
        id: &AgreementId,
        document: DocumentRef,
        now: DateTime<Utc>,
    ) -> Result<Agreement, WorkflowError> {
        self.require_candidate(actor, "upload a signed agreement")?;

        let mut agreement = self.fetch_agreement(id)?;
        let application = self.fetch_application(&agreement.application_id)?;
        if application.candidate_id != actor.id {
            return Err(WorkflowError::not_found("agreement", id.0.clone()));
        }

        if agreement.signed_document.is_some() {
            return Err(WorkflowError::InvalidTransition {
                entity: "agreement",
                id: id.0.clone(),
                state: agreement.status().label(),
                action: "upload a signed document",
            });
        }

        agreement.signed_document = Some(document);
        agreement.signed_date = Some(now);
        let stored = self.store.update_agreement(agreement)?;

        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Agreement,
            entity_id: id.0.clone(),
            from_status: Some("draft"),
            to_status: stored.status().label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    /// Coordinator-only. Requires a signed document and no prior
    /// confirmation. The animal's readiness is re-read here, not taken from
    /// any earlier snapshot, so a vet revoking readiness between signing
    /// and confirmation blocks the adoption. The animal flip lands before
    /// the agreement row commits: a failure anywhere leaves the agreement
    /// unconfirmed and the operation retryable. Side effects: the animal
    /// becomes permanently adopted and the first post-adoption report is
    /// created, due `confirmed_date + offset` days.
    pub fn confirm_agreement(
        &self,
        actor: &Actor,
        id: &AgreementId,
        confirmed_date: DateTime<Utc>,
    ) -> Result<Agreement, WorkflowError> {
        self.require_coordinator(actor, "confirm an agreement")?;

        let mut agreement = self.fetch_agreement(id)?;
        if agreement.confirmed_at.is_some() {
            return Err(WorkflowError::InvalidTransition {
                entity: "agreement",
                id: id.0.clone(),
                state: "confirmed",
                action: "confirm",
            });
        }
        if agreement.signed_document.is_none() {
            return Err(WorkflowError::InvalidTransition {
                entity: "agreement",
                id: id.0.clone(),
                state: "draft",
                action: "confirm",
            });
        }

        let application = self.fetch_application(&agreement.application_id)?;

        // The adoption flip races with veterinary writes that bump the
        // animal version without revoking readiness. On a stale write,
        // re-read and re-check instead of bouncing the caller; readiness
        // revoked under us still aborts before the agreement commits.
        let mut animal = self.fetch_animal(&application.animal_id)?;
        let animal = loop {
            if !animal.ready_for_adoption {
                return Err(WorkflowError::Guard {
                    failing: vec![IssuanceGuard::AnimalReady],
                });
            }
            let mut adopted = animal.clone();
            adopted.status = AnimalStatus::Adopted;
            match self.store.update_animal(adopted) {
                Ok(stored) => break stored,
                Err(WorkflowError::Conflict(_)) => {
                    animal = self.fetch_animal(&application.animal_id)?;
                }
                Err(err) => return Err(err),
            }
        };

        agreement.confirmed_at = Some(confirmed_date);
        // The agreement row commits last: a stale snapshot (concurrent
        // confirm) fails the version check here, and the losing caller has
        // changed nothing the winner did not also want.
        let stored = self.store.update_agreement(agreement)?;

        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Animal,
            entity_id: animal.id.0.clone(),
            from_status: Some(AnimalStatus::Sheltered.label()),
            to_status: AnimalStatus::Adopted.label(),
            actor_id: actor.id.clone(),
            timestamp: confirmed_date,
        });

        let cadence = self.settings.report_cadence();
        let first_report = PostAdoptionReport {
            id: next_report_id(),
            agreement_id: stored.id.clone(),
            due_date: confirmed_date.date_naive() + Duration::days(cadence.offset_days),
            submitted_at: None,
            report_text: None,
            media: Vec::new(),
            coordinator_feedback: None,
            status: ReportStatus::Pending,
            created_at: confirmed_date,
            version: 0,
        };
        let first_report = self.store.insert_report(first_report)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Report,
            entity_id: first_report.id.0.clone(),
            from_status: None,
            to_status: ReportStatus::Pending.label(),
            actor_id: actor.id.clone(),
            timestamp: confirmed_date,
        });

        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Agreement,
            entity_id: id.0.clone(),
            from_status: Some("signed"),
            to_status: stored.status().label(),
            actor_id: actor.id.clone(),
            timestamp: confirmed_date,
        });

        info!(
            agreement = %id.0,
            animal = %animal.id.0,
            first_report_due = %first_report.due_date,
            "adoption confirmed"
        );
        Ok(stored)
    }

    /// Blank agreement template from the settings collaborator.
    pub fn agreement_template(&self) -> DocumentRef {
        self.settings.agreement_template()
    }

    /// The uploaded signed document; `NotFound` before the candidate has
    /// uploaded one.
    pub fn signed_agreement_document(
        &self,
        actor: &Actor,
        id: &AgreementId,
    ) -> Result<DocumentRef, WorkflowError> {
        let agreement = self.agreement(actor, id)?;
        agreement
            .signed_document
            .ok_or_else(|| WorkflowError::not_found("signed document", id.0.clone()))
    }
}
