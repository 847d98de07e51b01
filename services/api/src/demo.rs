use crate::infra::{ConfigSettings, InMemoryAdoptionStore, InMemoryEventPublisher};
use adopt_track::config::ReportCadenceConfig;
use adopt_track::error::AppError;
use adopt_track::workflows::adoption::{
    Actor, AdoptionStore, AdoptionWorkflowService, Animal, AnimalId, AnimalStatus,
    ApplicationDraft, DocumentRef, InterviewOutcome, Role, WorkflowError,
};
use chrono::{Duration, FixedOffset, NaiveDate, Utc};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the closing overdue read (YYYY-MM-DD). Defaults
    /// to 31 days after the demo's confirmation date.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Report cadence in days between submissions
    #[arg(long, default_value_t = 30)]
    pub(crate) offset_days: i64,
    /// Fill window in days after each due date
    #[arg(long, default_value_t = 7)]
    pub(crate) fill_days: i64,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        as_of,
        offset_days,
        fill_days,
    } = args;

    let store = Arc::new(InMemoryAdoptionStore::default());
    let events = Arc::new(InMemoryEventPublisher::default());
    let settings = Arc::new(ConfigSettings::from_config(&ReportCadenceConfig {
        offset_days,
        fill_days,
    }));
    let service = AdoptionWorkflowService::new(store.clone(), events.clone(), settings);

    let candidate = Actor::new("cand-demo", Role::Candidate);
    let coordinator = Actor::new("coord-demo", Role::Coordinator);
    let vet = Actor::new("vet-demo", Role::Veterinarian);

    let animal_id = AnimalId("animal-demo".to_string());
    store.insert_animal(Animal {
        id: animal_id.clone(),
        name: "Mishka".to_string(),
        ready_for_adoption: false,
        status: AnimalStatus::Sheltered,
        version: 0,
    })?;

    println!("Adoption lifecycle demo");
    println!("Cadence: every {offset_days} days, {fill_days}-day fill window\n");

    let now = Utc::now();
    let application = service.submit_application(
        &candidate,
        ApplicationDraft {
            animal_id: animal_id.clone(),
            reason: "our family wants a companion".to_string(),
            experience: "raised two shelter dogs".to_string(),
            housing: "house with a fenced yard".to_string(),
            passport_document: None,
        },
        now,
    )?;
    println!(
        "1. {} applied to adopt Mishka -> application {} ({})",
        candidate.id.0,
        application.id.0,
        application.status.label()
    );

    let moscow = FixedOffset::east_opt(3 * 3600).ok_or_else(|| {
        AppError::from(WorkflowError::Validation(vec![
            "invalid demo timezone offset".to_string(),
        ]))
    })?;
    let scheduled_local = (now + Duration::days(3)).with_timezone(&moscow);
    let interview = service.schedule_interview(&coordinator, &application.id, scheduled_local, now)?;
    println!(
        "2. Interview scheduled for {} (stored as {} UTC)",
        scheduled_local.to_rfc3339(),
        interview.scheduled_at.to_rfc3339()
    );

    service.confirm_interview(&candidate, &interview.id, now)?;
    service.complete_interview(
        &coordinator,
        &interview.id,
        InterviewOutcome::Approved,
        "great fit for the household",
        now,
    )?;
    println!("3. Interview confirmed and completed with an approving outcome");

    match service.create_agreement(&coordinator, &application.id, "weekly photo updates", now) {
        Err(WorkflowError::Guard { failing }) => {
            println!("4. Agreement blocked until every precondition holds:");
            for guard in &failing {
                println!("   - {}", guard.describe());
            }
        }
        Ok(_) => println!("4. Agreement created (no guards outstanding)"),
        Err(err) => return Err(err.into()),
    }

    service.attach_passport(
        &candidate,
        &application.id,
        DocumentRef("docs/passport.pdf".to_string()),
    )?;
    service.mark_animal_ready(&vet, &animal_id, now)?;
    println!("5. Passport on file and veterinary readiness certified");

    let agreement =
        service.create_agreement(&coordinator, &application.id, "weekly photo updates", now)?;
    service.upload_signed_agreement(
        &candidate,
        &agreement.id,
        DocumentRef("docs/agreement-signed.pdf".to_string()),
        now,
    )?;
    let confirmed = service.confirm_agreement(&coordinator, &agreement.id, now)?;
    println!(
        "6. Agreement {} signed and confirmed ({})",
        agreement.id.0,
        confirmed.status().label()
    );

    let animal = store
        .fetch_animal(&animal_id)?
        .ok_or_else(|| AppError::from(WorkflowError::not_found("animal", animal_id.0.clone())))?;
    println!("   Mishka is now {}", animal.status.label());

    let reports = store.reports_by_agreement(&agreement.id)?;
    let first = reports
        .first()
        .ok_or_else(|| AppError::from(WorkflowError::not_found("report", "first".to_string())))?;
    println!("7. First post-adoption report due {}", first.due_date);

    let submission = service.submit_report(
        &candidate,
        &first.id,
        "settled in well, eating normally",
        vec![DocumentRef("media/week-one.jpg".to_string())],
        now,
    )?;
    println!(
        "8. Report submitted; next report chained, due {}",
        submission.next.due_date
    );

    let as_of = as_of.unwrap_or(submission.next.due_date + Duration::days(1));
    let views = service.reports_for_agreement(&coordinator, &agreement.id, as_of)?;
    println!("\nReport chain as of {as_of}:");
    for view in &views {
        println!(
            "- due {} (fill by {}) -> {}",
            view.due_date, view.fill_deadline, view.status
        );
    }

    println!("\n{} workflow events published", events.events().len());
    Ok(())
}
