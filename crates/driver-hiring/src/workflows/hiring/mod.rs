//! Driver hiring: history gap detection, the application status engine, and the
//! audit trail that records every transition and hire.

pub mod audit;
pub mod clock;
pub mod domain;
pub mod export;
pub mod history;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;

#[cfg(test)]
mod tests;

pub use audit::{AuditContext, EntityRef, FieldChange, LogAction, LogEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    AddressRecord, ApplicantProfile, ApplicationId, ApplicationSubmission, BackgroundCheck,
    BackgroundCheckResult, BackgroundCheckStatus, CompanyId, ConsentKind, ConsentRecord,
    Consents, DocumentPhotos, DriverId, DriverStatus, EmploymentRecord, GapAcknowledgement,
    SignatureRecord,
};
pub use export::{write_applications_csv, ExportError};
pub use history::{
    detect_gaps, GapPeriod, GapReport, HistoryError, HistoryKind, LookbackPolicy, MonthRange,
    Tenure, YearMonth,
};
pub use repository::{
    ApplicationPatch, ApplicationRecord, ApplicationStatusView, DriverRecord, HiringNotification,
    HiringRepository, NotificationError, NotificationPublisher, RepositoryError,
};
pub use router::hiring_router;
pub use service::{FailureKind, HireOutcome, HiringService, HiringServiceError, TransitionOutcome};
pub use status::{available_transitions, ApplicationStatus, TransitionPolicy};
