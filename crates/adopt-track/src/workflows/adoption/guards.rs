//! Stateless predicate layer gating agreement issuance.
//!
//! Every blocker is reported, not just the first, so callers can surface
//! the complete "missing passport / vet approval" picture in one response.

use serde::Serialize;

use super::domain::{Animal, Application, ApplicationStatus};

/// Preconditions that must all hold before an agreement may be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceGuard {
    ApplicationApproved,
    PassportOnFile,
    AnimalReady,
}

impl IssuanceGuard {
    pub const fn label(self) -> &'static str {
        match self {
            IssuanceGuard::ApplicationApproved => "application_approved",
            IssuanceGuard::PassportOnFile => "passport_on_file",
            IssuanceGuard::AnimalReady => "animal_ready",
        }
    }

    pub const fn describe(self) -> &'static str {
        match self {
            IssuanceGuard::ApplicationApproved => "the application has not been approved",
            IssuanceGuard::PassportOnFile => "no identity document is on file",
            IssuanceGuard::AnimalReady => "the animal has no veterinary readiness certification",
        }
    }
}

/// Returns the complete set of failing guards, empty when an agreement may
/// be issued.
pub fn issuance_blockers(application: &Application, animal: &Animal) -> Vec<IssuanceGuard> {
    let mut failing = Vec::new();

    if application.status != ApplicationStatus::Approved {
        failing.push(IssuanceGuard::ApplicationApproved);
    }
    if application.passport_document.is_none() {
        failing.push(IssuanceGuard::PassportOnFile);
    }
    if !animal.ready_for_adoption {
        failing.push(IssuanceGuard::AnimalReady);
    }

    failing
}

pub fn can_issue_agreement(application: &Application, animal: &Animal) -> bool {
    issuance_blockers(application, animal).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::adoption::domain::{
        ActorId, AnimalId, AnimalStatus, ApplicationId, DocumentRef,
    };
    use chrono::{TimeZone, Utc};

    fn application(status: ApplicationStatus, passport: bool) -> Application {
        Application {
            id: ApplicationId("apl-000001".to_string()),
            candidate_id: ActorId("cand-1".to_string()),
            animal_id: AnimalId("animal-1".to_string()),
            status,
            reason: "companionship".to_string(),
            experience: "grew up with dogs".to_string(),
            housing: "house with yard".to_string(),
            passport_document: passport.then(|| DocumentRef("docs/passport.pdf".to_string())),
            decision_comment: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            version: 0,
        }
    }

    fn animal(ready: bool) -> Animal {
        Animal {
            id: AnimalId("animal-1".to_string()),
            name: "Biscuit".to_string(),
            ready_for_adoption: ready,
            status: AnimalStatus::Sheltered,
            version: 0,
        }
    }

    #[test]
    fn all_guards_pass_for_approved_documented_ready_pair() {
        let app = application(ApplicationStatus::Approved, true);
        assert!(can_issue_agreement(&app, &animal(true)));
        assert!(issuance_blockers(&app, &animal(true)).is_empty());
    }

    #[test]
    fn every_failing_guard_is_reported() {
        let app = application(ApplicationStatus::Submitted, false);
        let failing = issuance_blockers(&app, &animal(false));
        assert_eq!(
            failing,
            vec![
                IssuanceGuard::ApplicationApproved,
                IssuanceGuard::PassportOnFile,
                IssuanceGuard::AnimalReady,
            ]
        );
    }

    #[test]
    fn each_single_blocker_is_isolated() {
        let cases = [
            (
                application(ApplicationStatus::UnderReview, true),
                animal(true),
                IssuanceGuard::ApplicationApproved,
            ),
            (
                application(ApplicationStatus::Approved, false),
                animal(true),
                IssuanceGuard::PassportOnFile,
            ),
            (
                application(ApplicationStatus::Approved, true),
                animal(false),
                IssuanceGuard::AnimalReady,
            ),
        ];

        for (app, animal, expected) in cases {
            assert_eq!(issuance_blockers(&app, &animal), vec![expected]);
        }
    }

    #[test]
    fn missing_passport_and_unready_animal_combine() {
        let app = application(ApplicationStatus::Approved, false);
        let failing = issuance_blockers(&app, &animal(false));
        assert_eq!(
            failing,
            vec![IssuanceGuard::PassportOnFile, IssuanceGuard::AnimalReady]
        );
    }
}
