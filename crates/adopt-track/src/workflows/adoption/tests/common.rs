use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::workflows::adoption::domain::{
    Actor, ActorId, Agreement, AgreementId, Animal, AnimalId, AnimalStatus, Application,
    ApplicationId, DocumentRef, Interview, InterviewId, InterviewOutcome, PostAdoptionReport,
    ReportCadence, ReportId, Role, WorkflowEvent,
};
use crate::workflows::adoption::error::WorkflowError;
use crate::workflows::adoption::service::AdoptionWorkflowService;
use crate::workflows::adoption::store::{
    AdoptionStore, EventError, EventPublisher, SettingsProvider,
};
use crate::workflows::adoption::ApplicationDraft;
use crate::workflows::adoption::ApplicationStatus;

pub(super) const OFFSET_DAYS: i64 = 30;
pub(super) const FILL_DAYS: i64 = 7;

#[derive(Default)]
struct StoreInner {
    applications: HashMap<ApplicationId, Application>,
    interviews: HashMap<InterviewId, Interview>,
    agreements: HashMap<AgreementId, Agreement>,
    reports: HashMap<ReportId, PostAdoptionReport>,
    animals: HashMap<AnimalId, Animal>,
}

impl StoreInner {
    fn live_application_exists(&self, candidate: &ActorId, animal: &AnimalId) -> bool {
        self.applications.values().any(|app| {
            app.candidate_id == *candidate && app.animal_id == *animal && {
                let confirmed = self.agreements.values().any(|agreement| {
                    agreement.application_id == app.id && agreement.confirmed_at.is_some()
                });
                app.is_live(confirmed)
            }
        })
    }
}

/// Single-mutex in-memory store: every trait call is one atomic
/// transaction, mirroring the transactional contract a database-backed
/// implementation provides.
#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub(super) fn seed_animal(&self, id: &str, ready: bool) -> Animal {
        let animal = Animal {
            id: AnimalId(id.to_string()),
            name: "Biscuit".to_string(),
            ready_for_adoption: ready,
            status: AnimalStatus::Sheltered,
            version: 0,
        };
        self.insert_animal(animal).expect("animal seeds")
    }

    pub(super) fn animal(&self, id: &AnimalId) -> Animal {
        self.fetch_animal(id)
            .expect("store available")
            .expect("animal present")
    }
}

fn stale(entity: &str) -> WorkflowError {
    WorkflowError::conflict(format!(
        "stale write: the {entity} changed since it was read"
    ))
}

impl AdoptionStore for MemoryStore {
    fn insert_application(&self, application: Application) -> Result<Application, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.live_application_exists(&application.candidate_id, &application.animal_id) {
            return Err(WorkflowError::conflict(
                "a live application already exists for this candidate and animal",
            ));
        }
        inner
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<Application, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.applications.get(&application.id) {
            None => Err(WorkflowError::not_found(
                "application",
                application.id.0.clone(),
            )),
            Some(existing) if existing.version != application.version => {
                Err(stale("application"))
            }
            Some(_) => {
                let mut stored = application;
                stored.version += 1;
                inner.applications.insert(stored.id.clone(), stored.clone());
                Ok(stored)
            }
        }
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.applications.get(id).cloned())
    }

    fn applications_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut matching: Vec<Application> = inner
            .applications
            .values()
            .filter(|app| app.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    fn insert_interview(&self, interview: Interview) -> Result<Interview, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let active_exists = inner
            .interviews
            .values()
            .any(|other| other.application_id == interview.application_id && other.is_active());
        if active_exists {
            return Err(WorkflowError::conflict(
                "an interview is already active for this application",
            ));
        }
        inner
            .interviews
            .insert(interview.id.clone(), interview.clone());
        Ok(interview)
    }

    fn update_interview(&self, interview: Interview) -> Result<Interview, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.interviews.get(&interview.id) {
            None => Err(WorkflowError::not_found("interview", interview.id.0.clone())),
            Some(existing) if existing.version != interview.version => Err(stale("interview")),
            Some(_) => {
                let mut stored = interview;
                stored.version += 1;
                inner.interviews.insert(stored.id.clone(), stored.clone());
                Ok(stored)
            }
        }
    }

    fn fetch_interview(&self, id: &InterviewId) -> Result<Option<Interview>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.interviews.get(id).cloned())
    }

    fn interviews_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Interview>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .interviews
            .values()
            .filter(|interview| interview.application_id == *application_id)
            .cloned()
            .collect())
    }

    fn insert_agreement(&self, agreement: Agreement) -> Result<Agreement, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let exists = inner
            .agreements
            .values()
            .any(|other| other.application_id == agreement.application_id);
        if exists {
            return Err(WorkflowError::conflict(
                "an agreement already exists for this application",
            ));
        }
        inner
            .agreements
            .insert(agreement.id.clone(), agreement.clone());
        Ok(agreement)
    }

    fn update_agreement(&self, agreement: Agreement) -> Result<Agreement, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.agreements.get(&agreement.id) {
            None => Err(WorkflowError::not_found("agreement", agreement.id.0.clone())),
            Some(existing) if existing.version != agreement.version => Err(stale("agreement")),
            Some(_) => {
                let mut stored = agreement;
                stored.version += 1;
                inner.agreements.insert(stored.id.clone(), stored.clone());
                Ok(stored)
            }
        }
    }

    fn fetch_agreement(&self, id: &AgreementId) -> Result<Option<Agreement>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.agreements.get(id).cloned())
    }

    fn agreement_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Agreement>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .agreements
            .values()
            .find(|agreement| agreement.application_id == *application_id)
            .cloned())
    }

    fn insert_report(
        &self,
        report: PostAdoptionReport,
    ) -> Result<PostAdoptionReport, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.reports.insert(report.id.clone(), report.clone());
        Ok(report)
    }

    fn update_report(
        &self,
        report: PostAdoptionReport,
    ) -> Result<PostAdoptionReport, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.reports.get(&report.id) {
            None => Err(WorkflowError::not_found("report", report.id.0.clone())),
            Some(existing) if existing.version != report.version => Err(stale("report")),
            Some(_) => {
                let mut stored = report;
                stored.version += 1;
                inner.reports.insert(stored.id.clone(), stored.clone());
                Ok(stored)
            }
        }
    }

    fn fetch_report(&self, id: &ReportId) -> Result<Option<PostAdoptionReport>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.reports.get(id).cloned())
    }

    fn reports_by_agreement(
        &self,
        agreement_id: &AgreementId,
    ) -> Result<Vec<PostAdoptionReport>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .reports
            .values()
            .filter(|report| report.agreement_id == *agreement_id)
            .cloned()
            .collect())
    }

    fn pending_reports_due_before(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<PostAdoptionReport>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .reports
            .values()
            .filter(|report| {
                report.status == crate::workflows::adoption::ReportStatus::Pending
                    && report.due_date < today
            })
            .cloned()
            .collect())
    }

    fn insert_animal(&self, animal: Animal) -> Result<Animal, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.animals.insert(animal.id.clone(), animal.clone());
        Ok(animal)
    }

    fn update_animal(&self, animal: Animal) -> Result<Animal, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.animals.get(&animal.id) {
            None => Err(WorkflowError::not_found("animal", animal.id.0.clone())),
            Some(existing) if existing.version != animal.version => Err(stale("animal")),
            Some(_) => {
                let mut stored = animal;
                stored.version += 1;
                inner.animals.insert(stored.id.clone(), stored.clone());
                Ok(stored)
            }
        }
    }

    fn fetch_animal(&self, id: &AnimalId) -> Result<Option<Animal>, WorkflowError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.animals.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: &WorkflowEvent) -> Result<(), EventError> {
        let mut guard = self.events.lock().expect("event mutex poisoned");
        guard.push(event.clone());
        Ok(())
    }
}

/// Publisher whose transport is always down, for checking that transitions
/// survive notification failures.
#[derive(Default, Clone)]
pub(super) struct BrokenEvents;

impl EventPublisher for BrokenEvents {
    fn publish(&self, _event: &WorkflowEvent) -> Result<(), EventError> {
        Err(EventError::Transport("notification bus offline".to_string()))
    }
}

#[derive(Clone)]
pub(super) struct StaticSettings {
    pub(super) cadence: ReportCadence,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            cadence: ReportCadence {
                offset_days: OFFSET_DAYS,
                fill_days: FILL_DAYS,
            },
        }
    }
}

impl SettingsProvider for StaticSettings {
    fn report_cadence(&self) -> ReportCadence {
        self.cadence
    }

    fn agreement_template(&self) -> DocumentRef {
        DocumentRef("templates/adoption-agreement.pdf".to_string())
    }
}

pub(super) type TestService = AdoptionWorkflowService<MemoryStore, MemoryEvents, StaticSettings>;

pub(super) fn build_service() -> (Arc<TestService>, MemoryStore, MemoryEvents) {
    let store = MemoryStore::default();
    let events = MemoryEvents::default();
    let service = Arc::new(AdoptionWorkflowService::new(
        Arc::new(store.clone()),
        Arc::new(events.clone()),
        Arc::new(StaticSettings::default()),
    ));
    (service, store, events)
}

pub(super) fn candidate() -> Actor {
    Actor::new("cand-1", Role::Candidate)
}

pub(super) fn other_candidate() -> Actor {
    Actor::new("cand-2", Role::Candidate)
}

pub(super) fn coordinator() -> Actor {
    Actor::new("coord-1", Role::Coordinator)
}

pub(super) fn veterinarian() -> Actor {
    Actor::new("vet-1", Role::Veterinarian)
}

pub(super) fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .expect("valid time")
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn moscow_time(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3 * 3600)
        .expect("valid offset")
        .with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .expect("valid time")
}

pub(super) fn draft(animal_id: &str) -> ApplicationDraft {
    ApplicationDraft {
        animal_id: AnimalId(animal_id.to_string()),
        reason: "our family wants a companion".to_string(),
        experience: "raised two shelter dogs".to_string(),
        housing: "house with a fenced yard".to_string(),
        passport_document: None,
    }
}

/// Drive a freshly seeded animal and candidate through submission,
/// interview, and approval, returning the approved application id.
pub(super) fn approved_application(
    service: &TestService,
    store: &MemoryStore,
    animal_id: &str,
) -> ApplicationId {
    store.seed_animal(animal_id, false);
    let application = service
        .submit_application(&candidate(), draft(animal_id), ts(2024, 1, 1, 9))
        .expect("submission succeeds");

    let interview = service
        .schedule_interview(
            &coordinator(),
            &application.id,
            moscow_time(2024, 1, 5, 10),
            ts(2024, 1, 2, 9),
        )
        .expect("interview schedules");
    service
        .confirm_interview(&candidate(), &interview.id, ts(2024, 1, 3, 9))
        .expect("candidate confirms");
    service
        .complete_interview(
            &coordinator(),
            &interview.id,
            InterviewOutcome::Approved,
            "great fit for the household",
            ts(2024, 1, 6, 9),
        )
        .expect("interview completes");

    application.id
}

/// Extend an approved application into a confirmed agreement, returning
/// (application id, agreement id, first report id).
pub(super) fn confirmed_agreement(
    service: &TestService,
    store: &MemoryStore,
    animal_id: &str,
) -> (ApplicationId, AgreementId, ReportId) {
    let application_id = approved_application(service, store, animal_id);
    service
        .attach_passport(
            &candidate(),
            &application_id,
            DocumentRef("docs/passport.pdf".to_string()),
        )
        .expect("passport attaches");
    service
        .mark_animal_ready(&veterinarian(), &AnimalId(animal_id.to_string()), ts(2024, 1, 10, 9))
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
    service
        .confirm_agreement(&coordinator(), &agreement.id, ts(2024, 1, 20, 12))
        .expect("confirmation succeeds");

    let reports = store
        .reports_by_agreement(&agreement.id)
        .expect("reports listed");
    assert_eq!(reports.len(), 1, "confirmation bootstraps one report");
    (application_id, agreement.id, reports[0].id.clone())
}
