use super::super::domain::Consents;
use super::super::repository::ApplicationRecord;
use super::ApplicationStatus;

/// Policy dial backing the optional PSP review stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionPolicy {
    pub require_psp_review: bool,
}

/// Next status chosen by the engine together with its audit rationale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomaticStep {
    pub to: ApplicationStatus,
    pub reason: String,
}

impl AutomaticStep {
    fn new(to: ApplicationStatus, reason: impl Into<String>) -> Self {
        Self {
            to,
            reason: reason.into(),
        }
    }
}

pub fn is_submission_valid(record: &ApplicationRecord) -> bool {
    record.profile.missing_fields().is_empty()
        && !record.addresses.is_empty()
        && !record.jobs.is_empty()
}

pub fn are_consents_signed(consents: &Consents) -> bool {
    consents.unsigned().is_empty()
}

pub fn is_psp_review_required(_record: &ApplicationRecord, policy: &TransitionPolicy) -> bool {
    policy.require_psp_review
}

/// Deterministic next status for `record`, or `None` where only an operator can move it.
pub fn automatic_next(
    record: &ApplicationRecord,
    policy: &TransitionPolicy,
) -> Option<AutomaticStep> {
    let step = match record.status {
        ApplicationStatus::New => {
            if is_submission_valid(record) {
                AutomaticStep::new(ApplicationStatus::UnderReview, "Submission complete")
            } else {
                AutomaticStep::new(
                    ApplicationStatus::OnHold,
                    format!("Submission incomplete: {}", submission_gaps(record).join(", ")),
                )
            }
        }
        ApplicationStatus::UnderReview => {
            if are_consents_signed(&record.consents) {
                AutomaticStep::new(ApplicationStatus::MvrCheck, "All consents signed")
            } else {
                let unsigned: Vec<&str> = record
                    .consents
                    .unsigned()
                    .into_iter()
                    .map(|kind| kind.label())
                    .collect();
                AutomaticStep::new(
                    ApplicationStatus::OnHold,
                    format!("Consents incomplete: {}", unsigned.join(", ")),
                )
            }
        }
        ApplicationStatus::MvrCheck => {
            AutomaticStep::new(ApplicationStatus::DrugScreening, "MVR check complete")
        }
        ApplicationStatus::DrugScreening => {
            if is_psp_review_required(record, policy) {
                AutomaticStep::new(
                    ApplicationStatus::PspReview,
                    "Drug screening complete; PSP review required",
                )
            } else {
                AutomaticStep::new(
                    ApplicationStatus::BackgroundComplete,
                    "Drug screening complete",
                )
            }
        }
        ApplicationStatus::PspReview => {
            AutomaticStep::new(ApplicationStatus::BackgroundComplete, "PSP review complete")
        }
        ApplicationStatus::BackgroundComplete => {
            AutomaticStep::new(ApplicationStatus::Approved, "Background checks complete")
        }
        ApplicationStatus::Draft
        | ApplicationStatus::Approved
        | ApplicationStatus::Hired
        | ApplicationStatus::OnHold
        | ApplicationStatus::Rejected
        | ApplicationStatus::Disqualified
        | ApplicationStatus::Expired => return None,
    };

    Some(step)
}

fn submission_gaps(record: &ApplicationRecord) -> Vec<&'static str> {
    let mut gaps = record.profile.missing_fields();
    if record.addresses.is_empty() {
        gaps.push("addresses");
    }
    if record.jobs.is_empty() {
        gaps.push("jobs");
    }
    gaps
}
