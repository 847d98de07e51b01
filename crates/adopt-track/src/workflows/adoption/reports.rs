//! Recurring post-adoption reporting.
//!
//! The chain is relative to actual submissions, not a fixed calendar: each
//! submission creates exactly one successor due `offset` days later, so a
//! late submission shifts every future due date forward. Overdue is a
//! read-time classification; the reconciliation sweep exists only for
//! downstream notification and is never a correctness dependency.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use super::domain::{
    Actor, AgreementId, Application, DocumentRef, PostAdoptionReport, ReportId, ReportStatus,
    ReportView, WorkflowEntity, WorkflowEvent,
};
use super::error::WorkflowError;
use super::service::{next_report_id, AdoptionWorkflowService};
use super::store::{AdoptionStore, EventPublisher, SettingsProvider};

/// Result of submitting a report: the submitted link and the successor the
/// submission chained into existence.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSubmission {
    pub submitted: PostAdoptionReport,
    pub next: PostAdoptionReport,
}

impl<S, E, P> AdoptionWorkflowService<S, E, P>
where
    S: AdoptionStore + 'static,
    E: EventPublisher + 'static,
    P: SettingsProvider + 'static,
{
    pub fn reports_for_agreement(
        &self,
        actor: &Actor,
        agreement_id: &AgreementId,
        today: NaiveDate,
    ) -> Result<Vec<ReportView>, WorkflowError> {
        let agreement = self.fetch_agreement(agreement_id)?;
        let application = self.fetch_application(&agreement.application_id)?;
        self.ensure_application_visible(actor, &application)?;

        let cadence = self.settings.report_cadence();
        let mut reports = self.store.reports_by_agreement(agreement_id)?;
        reports.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(reports
            .iter()
            .map(|report| report.view(today, cadence.fill_days))
            .collect())
    }

    pub fn report(
        &self,
        actor: &Actor,
        id: &ReportId,
        today: NaiveDate,
    ) -> Result<ReportView, WorkflowError> {
        let report = self.fetch_report(id)?;
        self.application_for_report(actor, &report)?;
        let cadence = self.settings.report_cadence();
        Ok(report.view(today, cadence.fill_days))
    }

    /// Candidate-only (owner). Allowed while the stored status is pending
    /// or overdue; chains exactly one successor. A repeat submission fails
    /// `InvalidTransition` and creates nothing.
    pub fn submit_report(
        &self,
        actor: &Actor,
        id: &ReportId,
        text: &str,
        media: Vec<DocumentRef>,
        now: DateTime<Utc>,
    ) -> Result<ReportSubmission, WorkflowError> {
        self.require_candidate(actor, "submit a report")?;
        if text.trim().is_empty() {
            return Err(WorkflowError::Validation(vec![
                "report text is required".to_string(),
            ]));
        }

        let mut report = self.fetch_report(id)?;
        let application = self.application_for_report(actor, &report)?;
        if application.candidate_id != actor.id {
            return Err(WorkflowError::not_found("report", id.0.clone()));
        }

        if !matches!(report.status, ReportStatus::Pending | ReportStatus::Overdue) {
            return Err(WorkflowError::InvalidTransition {
                entity: "report",
                id: id.0.clone(),
                state: report.status.label(),
                action: "submit",
            });
        }

        let from = report.status;
        report.status = ReportStatus::Submitted;
        report.submitted_at = Some(now);
        report.report_text = Some(text.trim().to_string());
        report.media = media;
        let agreement_id = report.agreement_id.clone();
        let submitted = self.store.update_report(report)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Report,
            entity_id: id.0.clone(),
            from_status: Some(from.label()),
            to_status: ReportStatus::Submitted.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });

        let cadence = self.settings.report_cadence();
        let next = PostAdoptionReport {
            id: next_report_id(),
            agreement_id,
            due_date: now.date_naive() + Duration::days(cadence.offset_days),
            submitted_at: None,
            report_text: None,
            media: Vec::new(),
            coordinator_feedback: None,
            status: ReportStatus::Pending,
            created_at: now,
            version: 0,
        };
        let next = self.store.insert_report(next)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Report,
            entity_id: next.id.0.clone(),
            from_status: None,
            to_status: ReportStatus::Pending.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });

        Ok(ReportSubmission { submitted, next })
    }

    /// Coordinator-only; submitted → reviewed, terminal for this link. The
    /// successor created at submission time is unaffected.
    pub fn review_report(
        &self,
        actor: &Actor,
        id: &ReportId,
        feedback: &str,
        now: DateTime<Utc>,
    ) -> Result<PostAdoptionReport, WorkflowError> {
        self.require_coordinator(actor, "review a report")?;
        if feedback.trim().is_empty() {
            return Err(WorkflowError::Validation(vec![
                "review feedback is required".to_string(),
            ]));
        }

        let mut report = self.fetch_report(id)?;
        if report.status != ReportStatus::Submitted {
            return Err(WorkflowError::InvalidTransition {
                entity: "report",
                id: id.0.clone(),
                state: report.status.label(),
                action: "review",
            });
        }

        report.status = ReportStatus::Reviewed;
        report.coordinator_feedback = Some(feedback.trim().to_string());
        let stored = self.store.update_report(report)?;
        self.emit(WorkflowEvent {
            entity: WorkflowEntity::Report,
            entity_id: id.0.clone(),
            from_status: Some(ReportStatus::Submitted.label()),
            to_status: ReportStatus::Reviewed.label(),
            actor_id: actor.id.clone(),
            timestamp: now,
        });
        Ok(stored)
    }

    /// Periodic reconciliation pass, not a user-facing operation: persists
    /// pending → overdue for reports past due so notification jobs can key
    /// off the stored status. Read-time classification stays correct
    /// whether or not this ever runs.
    pub fn reconcile_overdue_reports(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReportId>, WorkflowError> {
        let mut flipped = Vec::new();
        for mut report in self.store.pending_reports_due_before(today)? {
            let id = report.id.clone();
            report.status = ReportStatus::Overdue;
            self.store.update_report(report)?;
            self.emit(WorkflowEvent {
                entity: WorkflowEntity::Report,
                entity_id: id.0.clone(),
                from_status: Some(ReportStatus::Pending.label()),
                to_status: ReportStatus::Overdue.label(),
                actor_id: self.system_actor_id(),
                timestamp: now,
            });
            flipped.push(id);
        }

        debug!(count = flipped.len(), "overdue reconciliation pass");
        Ok(flipped)
    }

    fn application_for_report(
        &self,
        actor: &Actor,
        report: &PostAdoptionReport,
    ) -> Result<Application, WorkflowError> {
        let agreement = self.fetch_agreement(&report.agreement_id)?;
        let application = self.fetch_application(&agreement.application_id)?;
        if !actor.is_staff() && application.candidate_id != actor.id {
            return Err(WorkflowError::not_found("report", report.id.0.clone()));
        }
        Ok(application)
    }
}
