use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for adoption applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for interviews.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterviewId(pub String);

/// Identifier wrapper for adoption agreements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgreementId(pub String);

/// Identifier wrapper for post-adoption reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

/// Identifier wrapper for shelter animals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalId(pub String);

/// Identifier for the person performing an operation. Identity itself comes
/// from the auth collaborator; the workflow only cares about id and role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

/// Opaque reference to a blob held by the file-storage collaborator
/// (passport scans, signed agreements, report media).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef(pub String);

/// Roles recognized by the capability checks in front of every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    Coordinator,
    Veterinarian,
    Volunteer,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Coordinator => "coordinator",
            Role::Veterinarian => "veterinarian",
            Role::Volunteer => "volunteer",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "candidate" => Some(Role::Candidate),
            "coordinator" => Some(Role::Coordinator),
            "veterinarian" | "vet" => Some(Role::Veterinarian),
            "volunteer" => Some(Role::Volunteer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated caller of a workflow operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: ActorId(id.into()),
            role,
        }
    }

    /// Coordinator-level capability; admin inherits everything a
    /// coordinator may do.
    pub fn is_coordinator(&self) -> bool {
        matches!(self.role, Role::Coordinator | Role::Admin)
    }

    pub fn is_candidate(&self) -> bool {
        matches!(self.role, Role::Candidate)
    }

    /// Staff can see records regardless of ownership.
    pub fn is_staff(&self) -> bool {
        matches!(
            self.role,
            Role::Coordinator | Role::Admin | Role::Veterinarian
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Cancelled,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(ApplicationStatus::Submitted),
            "under_review" => Some(ApplicationStatus::UnderReview),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            "cancelled" => Some(ApplicationStatus::Cancelled),
            _ => None,
        }
    }
}

/// A candidate's request to adopt a specific animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub candidate_id: ActorId,
    pub animal_id: AnimalId,
    pub status: ApplicationStatus,
    pub reason: String,
    pub experience: String,
    pub housing: String,
    pub passport_document: Option<DocumentRef>,
    pub decision_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Application {
    pub fn is_terminal_status(&self) -> bool {
        matches!(
            self.status,
            ApplicationStatus::Rejected | ApplicationStatus::Cancelled
        )
    }

    /// A live application blocks new submissions for the same pair and may
    /// still be decided or cancelled. Approved applications stay live until
    /// a confirmed agreement supersedes them.
    pub fn is_live(&self, has_confirmed_agreement: bool) -> bool {
        match self.status {
            ApplicationStatus::Submitted | ApplicationStatus::UnderReview => true,
            ApplicationStatus::Approved => !has_confirmed_agreement,
            ApplicationStatus::Rejected | ApplicationStatus::Cancelled => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl InterviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::Confirmed => "confirmed",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewOutcome {
    Approved,
    Rejected,
}

impl InterviewOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            InterviewOutcome::Approved => "approved",
            InterviewOutcome::Rejected => "rejected",
        }
    }
}

/// A meeting between coordinator and candidate tied to one application.
/// Scheduled times arrive with an explicit UTC offset and are stored UTC;
/// presentation layers convert for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub application_id: ApplicationId,
    pub scheduled_at: DateTime<Utc>,
    pub status: InterviewStatus,
    pub coordinator_notes: Option<String>,
    pub outcome: Option<InterviewOutcome>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Interview {
    /// Active interviews block scheduling another for the same application.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            InterviewStatus::Scheduled | InterviewStatus::Confirmed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Draft,
    Signed,
    Confirmed,
}

impl AgreementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AgreementStatus::Draft => "draft",
            AgreementStatus::Signed => "signed",
            AgreementStatus::Confirmed => "confirmed",
        }
    }
}

/// The legal adoption contract record, bound 1:1 to an approved
/// application. The lifecycle status is derived from which documents and
/// timestamps are present rather than stored separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: AgreementId,
    pub application_id: ApplicationId,
    pub coordinator_id: ActorId,
    pub post_adoption_plan: String,
    pub signed_document: Option<DocumentRef>,
    pub signed_date: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Agreement {
    pub fn status(&self) -> AgreementStatus {
        if self.confirmed_at.is_some() {
            AgreementStatus::Confirmed
        } else if self.signed_document.is_some() {
            AgreementStatus::Signed
        } else {
            AgreementStatus::Draft
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Submitted,
    Reviewed,
    Overdue,
}

impl ReportStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Overdue => "overdue",
        }
    }
}

/// One link in the recurring post-adoption reporting chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAdoptionReport {
    pub id: ReportId,
    pub agreement_id: AgreementId,
    pub due_date: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
    pub report_text: Option<String>,
    pub media: Vec<DocumentRef>,
    pub coordinator_feedback: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl PostAdoptionReport {
    /// Read-time classification: a pending report past its due date is
    /// overdue on every read, with no timer or stored flag involved. A
    /// submitted report never reads as overdue again.
    pub fn effective_status(&self, today: NaiveDate) -> ReportStatus {
        match self.status {
            ReportStatus::Pending if today > self.due_date => ReportStatus::Overdue,
            other => other,
        }
    }

    /// End of the grace window candidates get to complete the report.
    pub fn fill_deadline(&self, fill_days: i64) -> NaiveDate {
        self.due_date + Duration::days(fill_days)
    }

    pub fn view(&self, today: NaiveDate, fill_days: i64) -> ReportView {
        ReportView {
            id: self.id.clone(),
            agreement_id: self.agreement_id.clone(),
            due_date: self.due_date,
            fill_deadline: self.fill_deadline(fill_days),
            submitted_at: self.submitted_at,
            report_text: self.report_text.clone(),
            media: self.media.clone(),
            coordinator_feedback: self.coordinator_feedback.clone(),
            status: self.effective_status(today).label(),
        }
    }
}

/// Read model for a report with the derived overdue classification and
/// fill window applied, so every client agrees on overdue state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub id: ReportId,
    pub agreement_id: AgreementId,
    pub due_date: NaiveDate,
    pub fill_deadline: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
    pub report_text: Option<String>,
    pub media: Vec<DocumentRef>,
    pub coordinator_feedback: Option<String>,
    pub status: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalStatus {
    Sheltered,
    Adopted,
}

impl AnimalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AnimalStatus::Sheltered => "sheltered",
            AnimalStatus::Adopted => "adopted",
        }
    }
}

/// The slice of the animal record the workflow reads and writes. The full
/// animal profile lives with an external collaborator; readiness is set by
/// the veterinary flow and `Adopted` only ever through agreement
/// confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub name: String,
    pub ready_for_adoption: bool,
    pub status: AnimalStatus,
    pub version: u64,
}

/// Report cadence pulled from the settings collaborator. These two numbers
/// entirely define the recurring schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportCadence {
    pub offset_days: i64,
    pub fill_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEntity {
    Application,
    Interview,
    Agreement,
    Report,
    Animal,
}

impl WorkflowEntity {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowEntity::Application => "application",
            WorkflowEntity::Interview => "interview",
            WorkflowEntity::Agreement => "agreement",
            WorkflowEntity::Report => "report",
            WorkflowEntity::Animal => "animal",
        }
    }
}

/// Fire-and-forget event emitted on each transition for the notification
/// and audit collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowEvent {
    pub entity: WorkflowEntity,
    pub entity_id: String,
    pub from_status: Option<&'static str>,
    pub to_status: &'static str,
    pub actor_id: ActorId,
    pub timestamp: DateTime<Utc>,
}
