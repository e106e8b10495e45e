//! Application lifecycle states and the transition table between them.
//!
//! ```text
//! Draft -> New -> Under Review -> MVR Check -> Drug Screening -> [PSP Review] ->
//!     Background Complete -> Approved -> Hired
//! ```
//!
//! `On Hold` parks an application from any active stage. `Hired`, `Rejected`,
//! `Disqualified` and `Expired` are terminal.

mod gates;

pub use gates::{
    are_consents_signed, automatic_next, is_psp_review_required, is_submission_valid,
    AutomaticStep, TransitionPolicy,
};

use serde::{Deserialize, Serialize};

/// High level status tracked throughout the hiring workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "Draft")]
    Draft,
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Under Review")]
    UnderReview,
    #[serde(rename = "MVR Check")]
    MvrCheck,
    #[serde(rename = "Drug Screening")]
    DrugScreening,
    #[serde(rename = "PSP Review")]
    PspReview,
    #[serde(rename = "Background Complete")]
    BackgroundComplete,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Hired")]
    Hired,
    #[serde(rename = "On Hold")]
    OnHold,
    #[serde(rename = "Rejected")]
    Rejected,
    #[serde(rename = "Disqualified")]
    Disqualified,
    #[serde(rename = "Expired")]
    Expired,
}

use ApplicationStatus::*;

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 13] {
        [
            Draft,
            New,
            UnderReview,
            MvrCheck,
            DrugScreening,
            PspReview,
            BackgroundComplete,
            Approved,
            Hired,
            OnHold,
            Rejected,
            Disqualified,
            Expired,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Draft => "Draft",
            New => "New",
            UnderReview => "Under Review",
            MvrCheck => "MVR Check",
            DrugScreening => "Drug Screening",
            PspReview => "PSP Review",
            BackgroundComplete => "Background Complete",
            Approved => "Approved",
            Hired => "Hired",
            OnHold => "On Hold",
            Rejected => "Rejected",
            Disqualified => "Disqualified",
            Expired => "Expired",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(wanted))
    }

    pub fn is_terminal(self) -> bool {
        available_transitions(self).is_empty()
    }

    /// Statuses the applicant hears about by e-mail.
    pub const fn notifies_applicant(self) -> bool {
        matches!(self, OnHold | Approved | Rejected | Disqualified | Expired)
    }

    /// Stages during which the mocked background check is running.
    pub const fn is_screening_stage(self) -> bool {
        matches!(self, MvrCheck | DrugScreening | PspReview)
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Allowed next states, consulted by the manual-override selector.
pub const TRANSITIONS: &[(ApplicationStatus, &[ApplicationStatus])] = &[
    (Draft, &[New, Expired]),
    (New, &[UnderReview, OnHold, Rejected, Disqualified, Expired]),
    (UnderReview, &[MvrCheck, OnHold, Rejected, Disqualified]),
    (MvrCheck, &[DrugScreening, OnHold, Rejected, Disqualified]),
    (
        DrugScreening,
        &[PspReview, BackgroundComplete, OnHold, Rejected, Disqualified],
    ),
    (PspReview, &[BackgroundComplete, OnHold, Rejected, Disqualified]),
    (BackgroundComplete, &[Approved, OnHold, Rejected, Disqualified]),
    (Approved, &[Hired, OnHold, Rejected]),
    (OnHold, &[New, UnderReview, Rejected, Disqualified, Expired]),
    (Hired, &[]),
    (Rejected, &[]),
    (Disqualified, &[]),
    (Expired, &[]),
];

pub fn available_transitions(current: ApplicationStatus) -> &'static [ApplicationStatus] {
    TRANSITIONS
        .iter()
        .find(|(status, _)| *status == current)
        .map(|(_, next)| *next)
        .unwrap_or(&[])
}
