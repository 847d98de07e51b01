//! Interview scheduling tied to one application at a time.
//!
//! Scheduling accepts a timestamp with an explicit UTC offset and stores
//! UTC, so a coordinator and a candidate in different timezones always see
//! the same instant.

use chrono::{DateTime, FixedOffset, Utc};

use super::domain::{
    Actor, ApplicationId, ApplicationStatus, Interview, InterviewId, InterviewOutcome,
    InterviewStatus, WorkflowEntity, WorkflowEvent,
};
use super::error::WorkflowError;
use super::service::{next_interview_id, AdoptionWorkflowService};
use super::store::{AdoptionStore, EventPublisher, SettingsProvider};

const DECLINED_COMMENT: &str = "rejected automatically: candidate declined the scheduled interview";

impl<S, E, P> AdoptionWorkflowService<S, E, P>
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    /// Coordinator-only. The application must be live and must not already
    /// have an active interview (the store enforces the latter atomically).
    /// A freshly submitted application advances to `under_review`.
    pub fn schedule_interview(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        scheduled_at: DateTime<FixedOffset>,
        now: DateTime<Utc>,
    ) -> Result<Interview, WorkflowError> {
        self.require_coordinator(actor, "schedule an interview")?;

        let mut application = self.fetch_application(application_id)?;
        if !application.is_live(self.has_confirmed_agreement(application_id)?) {
            return Err(WorkflowError::InvalidTransition {
                entity: "application",
                id: application_id.0.clone(),
                state: application.status.label(),
                action: "schedule an interview",
            });
        }

        let interview = Interview {
            id: next_interview_id(),
            application_id: application_id.clone(),
            scheduled_at: scheduled_at.with_timezone(&Utc),
            status: InterviewStatus::Scheduled,
            coordinator_notes: None,
            outcome: None,
            created_at: now,
            version: 0,
        };
        let stored = self.store.insert_interview(interview)?;

        if application.status == ApplicationStatus::Submitted {
            application.status = ApplicationStatus::UnderReview;
            self.store.update_application(application)?;
            self.emit(WorkflowEvent {
                entity: WorkflowEntity::Application,
                entity_id: application_id.0.clone(),
                from_status: Some(ApplicationStatus::Submitted.label()),
                to_status: ApplicationStatus::UnderReview.label(),
                actor_id: actor.id.clone(),
                timestamp: now,
            });
        }

        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Interview,
            entity_id: stored.id.0.clone(),
            from_status: None,
            to_status: InterviewStatus::Scheduled.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    /// Candidate-only (owner); scheduled → confirmed.
    pub fn confirm_interview(
        &self,
        actor: &Actor,
        id: &InterviewId,
        now: DateTime<Utc>,
    ) -> Result<Interview, WorkflowError> {
        self.require_candidate(actor, "confirm an interview")?;
        let mut interview = self.owned_interview(actor, id)?;

        if interview.status != InterviewStatus::Scheduled {
            return Err(WorkflowError::InvalidTransition {
                entity: "interview",
                id: id.0.clone(),
                state: interview.status.label(),
                action: "confirm",
            });
        }

        interview.status = InterviewStatus::Confirmed;
        let stored = self.store.update_interview(interview)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Interview,
            entity_id: id.0.clone(),
            from_status: Some(InterviewStatus::Scheduled.label()),
            to_status: InterviewStatus::Confirmed.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    /// Candidate-only (owner); scheduled → cancelled, and the application
    /// cascades to rejected with a system-authored comment.
    pub fn decline_interview(
        &self,
        actor: &Actor,
        id: &InterviewId,
        now: DateTime<Utc>,
    ) -> Result<Interview, WorkflowError> {
        self.require_candidate(actor, "decline an interview")?;
        let mut interview = self.owned_interview(actor, id)?;

        if interview.status != InterviewStatus::Scheduled {
            return Err(WorkflowError::InvalidTransition {
                entity: "interview",
                id: id.0.clone(),
                state: interview.status.label(),
                action: "decline",
            });
        }

        interview.status = InterviewStatus::Cancelled;
        let application_id = interview.application_id.clone();
        let stored = self.store.update_interview(interview)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Interview,
            entity_id: id.0.clone(),
            from_status: Some(InterviewStatus::Scheduled.label()),
            to_status: InterviewStatus::Cancelled.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });

        let mut application = self.fetch_application(&application_id)?;
        if !application.is_terminal_status() {
            let from = application.status;
            application.status = ApplicationStatus::Rejected;
            application.decision_comment = Some(DECLINED_COMMENT.to_string());
            self.store.update_application(application)?;
            self.emit(WorkflowEvent {
                entity: WorkflowEntity::Application,
                entity_id: application_id.0.clone(),
                from_status: Some(from.label()),
                to_status: ApplicationStatus::Rejected.label(),
                actor_id: actor.id.clone(),
                timestamp: now,
            });
        }

        Ok(stored)
    }

    /// Coordinator-only; confirmed → completed, and the outcome cascades
    /// into the application decision. The optimistic version check in the
    /// store rejects completion of an interview that was concurrently
    /// cancelled.
    pub fn complete_interview(
        &self,
        actor: &Actor,
        id: &InterviewId,
        outcome: InterviewOutcome,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<Interview, WorkflowError> {
        self.require_coordinator(actor, "complete an interview")?;
        if notes.trim().is_empty() {
            return Err(WorkflowError::Validation(vec![
                "completion notes are required".to_string(),
            ]));
        }

        let mut interview = self
            .store
            .fetch_interview(id)?
            .ok_or_else(|| WorkflowError::not_found("interview", id.0.clone()))?;

        if interview.status != InterviewStatus::Confirmed {
            return Err(WorkflowError::InvalidTransition {
                entity: "interview",
                id: id.0.clone(),
                state: interview.status.label(),
                action: "complete",
            });
        }

        interview.status = InterviewStatus::Completed;
        interview.outcome = Some(outcome);
        interview.coordinator_notes = Some(notes.trim().to_string());
        let application_id = interview.application_id.clone();
        let stored = self.store.update_interview(interview)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Interview,
            entity_id: id.0.clone(),
            from_status: Some(InterviewStatus::Confirmed.label()),
            to_status: InterviewStatus::Completed.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });

        let mut application = self.fetch_application(&application_id)?;
        let from = application.status;
        application.status = match outcome {
            InterviewOutcome::Approved => ApplicationStatus::Approved,
            InterviewOutcome::Rejected => ApplicationStatus::Rejected,
        };
        application.decision_comment = Some(notes.trim().to_string());
        self.store.update_application(application)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Application,
            entity_id: application_id.0.clone(),
            from_status: Some(from.label()),
            to_status: match outcome {
                InterviewOutcome::Approved => ApplicationStatus::Approved.label(),
                InterviewOutcome::Rejected => ApplicationStatus::Rejected.label(),
            },
            actor_id: actor.id.clone(),
            timestamp: now,
        });

        Ok(stored)
    }

    /// Coordinator-only; scheduled/confirmed → cancelled. The application
    /// is left as-is: the coordinator re-schedules or decides separately.
    pub fn cancel_interview(
        &self,
        actor: &Actor,
        id: &InterviewId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Interview, WorkflowError> {
        self.require_coordinator(actor, "cancel an interview")?;

        let mut interview = self
            .store
            .fetch_interview(id)?
            .ok_or_else(|| WorkflowError::not_found("interview", id.0.clone()))?;

        if !interview.is_active() {
            return Err(WorkflowError::InvalidTransition {
                entity: "interview",
                id: id.0.clone(),
                state: interview.status.label(),
                action: "cancel",
            });
        }

        let from = interview.status;
        interview.status = InterviewStatus::Cancelled;
        interview.coordinator_notes = Some(reason.trim().to_string());
        let stored = self.store.update_interview(interview)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Interview,
            entity_id: id.0.clone(),
            from_status: Some(from.label()),
            to_status: InterviewStatus::Cancelled.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    pub fn interviews_for_application(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<Interview>, WorkflowError> {
        let application = self.fetch_application(application_id)?;
        self.ensure_application_visible(actor, &application)?;

        let mut interviews = self.store.interviews_by_application(application_id)?;
        interviews.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(interviews)
    }

    /// Fetch an interview and check the calling candidate owns the parent
    /// application; invisible records read as `NotFound`.
    fn owned_interview(
        &self,
        actor: &Actor,
        id: &InterviewId,
    ) -> Result<Interview, WorkflowError> {
        let interview = self
            .store
            .fetch_interview(id)?
            .ok_or_else(|| WorkflowError::not_found("interview", id.0.clone()))?;

        let application = self.fetch_application(&interview.application_id)?;
        if application.candidate_id != actor.id {
            return Err(WorkflowError::not_found("interview", id.0.clone()));
        }
        Ok(interview)
    }
}
