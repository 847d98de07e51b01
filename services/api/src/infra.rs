use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use adopt_track::config::ReportCadenceConfig;
use adopt_track::workflows::adoption::{
    AdoptionStore, Agreement, AgreementId, Animal, AnimalId, Application, ApplicationId,
    ApplicationStatus, DocumentRef, EventError, EventPublisher, Interview, InterviewId,
    PostAdoptionReport, ReportCadence, ReportId, ReportStatus, SettingsProvider, WorkflowError,
    WorkflowEvent,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreInner {
    applications: HashMap<ApplicationId, Application>,
    interviews: HashMap<InterviewId, Interview>,
    agreements: HashMap<AgreementId, Agreement>,
    reports: HashMap<ReportId, PostAdoptionReport>,
    animals: HashMap<AnimalId, Animal>,
}

impl StoreInner {
    fn live_application_exists(&self, candidate: &Application) -> bool {
        self.applications.values().any(|app| {
            app.candidate_id == candidate.candidate_id && app.animal_id == candidate.animal_id && {
                let confirmed = self.agreements.values().any(|agreement| {
                    agreement.application_id == app.id && agreement.confirmed_at.is_some()
                });
                app.is_live(confirmed)
            }
        })
    }
}

/// One mutex over the whole dataset: each trait call is a single atomic
/// transaction, which is what the uniqueness and version contracts of
/// [`AdoptionStore`] require.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAdoptionStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryAdoptionStore {
    /// Seed the shelter roster. Animal intake is out of scope for the
    /// workflow service itself, so the host owns it.
    pub(crate) fn seed_animal(&self, animal: Animal) -> Result<Animal, WorkflowError> {
        self.insert_animal(animal)
    }
}

fn stale(entity: &str) -> WorkflowError {
    WorkflowError::conflict(format!(
        "stale write: the {entity} changed since it was read"
    ))
}

impl AdoptionStore for InMemoryAdoptionStore {
    fn insert_application(&self, application: Application) -> Result<Application, WorkflowError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.live_application_exists(&application) {
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
            .filter(|report| report.status == ReportStatus::Pending && report.due_date < today)
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

/// Logs each transition and keeps it in memory; a production deployment
/// swaps this for the notification bus client.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl InMemoryEventPublisher {
    pub(crate) fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for InMemoryEventPublisher {
    fn publish(&self, event: &WorkflowEvent) -> Result<(), EventError> {
        info!(
            entity = event.entity.label(),
            entity_id = %event.entity_id,
            to = event.to_status,
            "workflow transition"
        );
        let mut guard = self.events.lock().expect("event mutex poisoned");
        guard.push(event.clone());
        Ok(())
    }
}

const AGREEMENT_TEMPLATE_KEY: &str = "templates/adoption-agreement.pdf";

/// Settings snapshot taken from [`adopt_track::config::AppConfig`] at boot.
#[derive(Clone)]
pub(crate) struct ConfigSettings {
    cadence: ReportCadence,
}

impl ConfigSettings {
    pub(crate) fn from_config(reports: &ReportCadenceConfig) -> Self {
        Self {
            cadence: ReportCadence {
                offset_days: reports.offset_days,
                fill_days: reports.fill_days,
            },
        }
    }
}

impl SettingsProvider for ConfigSettings {
    fn report_cadence(&self) -> ReportCadence {
        self.cadence
    }

    fn agreement_template(&self) -> DocumentRef {
        DocumentRef(AGREEMENT_TEMPLATE_KEY.to_string())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
