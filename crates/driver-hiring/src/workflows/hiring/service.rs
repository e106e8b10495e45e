use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::audit::{AuditContext, EntityRef, LogAction, LogEntry};
use super::clock::{Clock, SystemClock};
use super::domain::{
    AddressRecord, ApplicationId, ApplicationSubmission, BackgroundCheck, BackgroundCheckResult,
    BackgroundCheckStatus, CompanyId, ConsentKind, ConsentRecord, DriverId, DriverStatus,
    EmploymentRecord,
};
use super::history::{GapReport, HistoryError, HistoryKind, LookbackPolicy, Tenure};
use super::repository::{
    ApplicationPatch, ApplicationRecord, DriverRecord, HiringNotification, HiringRepository,
    NotificationPublisher, RepositoryError,
};
use super::status::{automatic_next, available_transitions, ApplicationStatus, TransitionPolicy};
use crate::config::HiringConfig;

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DRIVER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_driver_id() -> DriverId {
    let id = DRIVER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DriverId(format!("drv-{id:06}"))
}

/// Service composing the repository, notification hook, clock, and hiring policies.
pub struct HiringService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
    lookback: LookbackPolicy,
    policy: TransitionPolicy,
}

impl<R, N> HiringService<R, N>
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>, config: HiringConfig) -> Self {
        Self::with_clock(repository, notifications, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        notifications: Arc<N>,
        config: HiringConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            notifications,
            clock,
            lookback: config.lookback_policy(),
            policy: config.transition_policy(),
        }
    }

    pub fn lookback(&self) -> LookbackPolicy {
        self.lookback
    }

    /// Run the gap detector against the configured window ending this month.
    pub fn check_history<T: Tenure>(
        &self,
        kind: HistoryKind,
        intervals: &[T],
    ) -> Result<GapReport, HistoryError> {
        self.lookback.check(kind, intervals, self.clock.current_month())
    }

    pub fn check_employment_history(
        &self,
        jobs: &[EmploymentRecord],
    ) -> Result<GapReport, HistoryError> {
        self.check_history(HistoryKind::Employment, jobs)
    }

    pub fn check_residency_history(
        &self,
        addresses: &[AddressRecord],
    ) -> Result<GapReport, HistoryError> {
        self.check_history(HistoryKind::Residency, addresses)
    }

    /// Persist a completed form as a `New` application.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
        context: &AuditContext,
    ) -> Result<ApplicationRecord, HiringServiceError> {
        self.ensure_history_accounted(&submission)?;

        let now = self.clock.now();
        let record = new_record(submission, ApplicationStatus::New, now);
        let stored = self.repository.insert_application(record)?;

        let entry = LogEntry::new(LogAction::Submitted, context, now)
            .with_metadata("company_id", stored.company_id.0.clone());
        self.repository
            .append_log(&EntityRef::Application(stored.id.clone()), entry)?;

        info!(
            application_id = %stored.id.0,
            company_id = %stored.company_id.0,
            "application submitted"
        );
        self.notify(&stored, "application_received", BTreeMap::new());

        self.fetch_required(&stored.id)
    }

    /// Persist an unfinished form without running any history checks.
    pub fn save_draft(
        &self,
        submission: ApplicationSubmission,
        context: &AuditContext,
    ) -> Result<ApplicationRecord, HiringServiceError> {
        let now = self.clock.now();
        let record = new_record(submission, ApplicationStatus::Draft, now);
        let stored = self.repository.insert_application(record)?;

        let entry =
            LogEntry::new(LogAction::Created, context, now).with_metadata("reason", "Draft saved");
        self.repository
            .append_log(&EntityRef::Application(stored.id.clone()), entry)?;

        self.fetch_required(&stored.id)
    }

    /// Promote a draft to `New` once its history passes the same checks as `submit`.
    pub fn submit_draft(
        &self,
        application_id: &ApplicationId,
        context: &AuditContext,
    ) -> Result<ApplicationRecord, HiringServiceError> {
        let record = self.fetch_required(application_id)?;
        if record.status != ApplicationStatus::Draft {
            return Err(HiringServiceError::NotDraft {
                status: record.status,
            });
        }

        self.ensure_acknowledged(
            HistoryKind::Employment,
            &record.jobs,
            record.acknowledged_gaps.employment,
        )?;
        self.ensure_acknowledged(
            HistoryKind::Residency,
            &record.addresses,
            record.acknowledged_gaps.residency,
        )?;

        self.apply_status(
            &record,
            ApplicationStatus::New,
            context.reason_or("Draft submitted"),
            context,
        )?;
        self.notify(&record, "application_received", BTreeMap::new());
        self.fetch_required(application_id)
    }

    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, HiringServiceError> {
        self.fetch_required(application_id)
    }

    pub fn driver(&self, driver_id: &DriverId) -> Result<DriverRecord, HiringServiceError> {
        self.repository
            .fetch_driver(driver_id)?
            .ok_or_else(|| HiringServiceError::DriverNotFound(driver_id.0.clone()))
    }

    pub fn applications_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<ApplicationRecord>, HiringServiceError> {
        let mut records = self.repository.applications_for_company(company_id)?;
        records.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(records)
    }

    pub fn available_transitions(
        &self,
        application_id: &ApplicationId,
    ) -> Result<&'static [ApplicationStatus], HiringServiceError> {
        let record = self.fetch_required(application_id)?;
        Ok(available_transitions(record.status))
    }

    /// Advance to the next gated status, or apply `target` as an operator override.
    pub fn process_status_transition(
        &self,
        application_id: &ApplicationId,
        target: Option<ApplicationStatus>,
        context: &AuditContext,
    ) -> TransitionOutcome {
        let result = self.fetch_required(application_id).and_then(|record| {
            let (to, reason) = match target {
                Some(target) => (target, context.reason_or("Manual status override")),
                None => match automatic_next(&record, &self.policy) {
                    Some(step) => (step.to, step.reason),
                    None => {
                        return Err(HiringServiceError::NoAutomaticTransition {
                            status: record.status,
                        })
                    }
                },
            };
            self.apply_status(&record, to, reason, context)
        });

        self.settle_transition(application_id, result)
    }

    /// Operator status change with no gating predicates.
    pub fn set_status(
        &self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
        context: &AuditContext,
    ) -> TransitionOutcome {
        let result = self.fetch_required(application_id).and_then(|record| {
            self.apply_status(
                &record,
                status,
                context.reason_or("Manual status change"),
                context,
            )
        });

        self.settle_transition(application_id, result)
    }

    /// Materialize a driver from an `Approved` application and mark it `Hired`.
    pub fn hire_driver(
        &self,
        application_id: &ApplicationId,
        context: &AuditContext,
    ) -> HireOutcome {
        match self.try_hire(application_id, context) {
            Ok(driver) => HireOutcome {
                success: true,
                driver_id: Some(driver.id),
                message: "Driver hired".to_string(),
                failure: None,
            },
            Err(err) => {
                let failure = err.failure_kind();
                if failure == FailureKind::Infrastructure {
                    error!(application_id = %application_id.0, error = %err, "hire failed");
                } else {
                    warn!(application_id = %application_id.0, error = %err, "hire rejected");
                }
                HireOutcome {
                    success: false,
                    driver_id: None,
                    message: err.to_string(),
                    failure: Some(failure),
                }
            }
        }
    }

    /// Replace one consent slot and record the signature metadata in the audit log.
    pub fn record_consent(
        &self,
        application_id: &ApplicationId,
        kind: ConsentKind,
        consent: ConsentRecord,
        context: &AuditContext,
    ) -> Result<ApplicationRecord, HiringServiceError> {
        let record = self.fetch_required(application_id)?;
        let now = self.clock.now();

        let previous = record.consents.get(kind).is_signed();
        let signed = consent.is_signed();
        let mut entry = LogEntry::new(LogAction::ConsentRecorded, context, now)
            .with_change(kind.label(), signed_label(previous), signed_label(signed))
            .with_metadata("consent", kind.label());
        if let Some(key) = &consent.signature.storage_key {
            entry = entry.with_metadata("signature_key", key.clone());
        }

        let mut consents = record.consents.clone();
        *consents.get_mut(kind) = consent;

        self.repository.update_application(
            application_id,
            ApplicationPatch {
                consents: Some(consents),
                updated_at: Some(now),
                ..ApplicationPatch::default()
            },
        )?;
        self.repository
            .append_log(&EntityRef::Application(application_id.clone()), entry)?;

        self.fetch_required(application_id)
    }

    pub fn set_driver_status(
        &self,
        driver_id: &DriverId,
        status: DriverStatus,
        context: &AuditContext,
    ) -> Result<DriverRecord, HiringServiceError> {
        let driver = self.driver(driver_id)?;
        if driver.status == status {
            return Ok(driver);
        }

        self.repository.update_driver_status(driver_id, status)?;
        let entry = LogEntry::new(LogAction::DriverStatusChanged, context, self.clock.now())
            .with_change("status", driver.status.label(), status.label())
            .with_metadata("reason", context.reason_or("Driver status change"));
        self.repository
            .append_log(&EntityRef::Driver(driver_id.clone()), entry)?;

        info!(
            driver_id = %driver_id.0,
            from = driver.status.label(),
            to = status.label(),
            "driver status changed"
        );
        self.driver(driver_id)
    }

    fn try_hire(
        &self,
        application_id: &ApplicationId,
        context: &AuditContext,
    ) -> Result<DriverRecord, HiringServiceError> {
        let record = self.fetch_required(application_id)?;
        if record.status != ApplicationStatus::Approved {
            return Err(HiringServiceError::NotApproved {
                status: record.status,
            });
        }

        let now = self.clock.now();
        let driver = match self.repository.driver_for_application(application_id)? {
            Some(existing) => existing,
            None => self
                .repository
                .create_driver(DriverRecord::from_application(next_driver_id(), &record, now))?,
        };

        // A retry after a partial hire finds the driver already logged.
        if driver.logs.is_empty() {
            let created = LogEntry::new(LogAction::Created, context, now)
                .with_metadata("application_id", application_id.0.clone());
            self.repository
                .append_log(&EntityRef::Driver(driver.id.clone()), created)?;
        }

        self.repository.update_application(
            application_id,
            ApplicationPatch {
                status: Some(ApplicationStatus::Hired),
                updated_at: Some(now),
                ..ApplicationPatch::default()
            },
        )?;

        let hired = LogEntry::new(LogAction::Hired, context, now)
            .with_change("status", ApplicationStatus::Approved, ApplicationStatus::Hired)
            .with_metadata("driver_id", driver.id.0.clone())
            .with_metadata("reason", context.reason_or("Driver hired"));
        if let Err(err) = self
            .repository
            .append_log(&EntityRef::Application(application_id.clone()), hired)
        {
            self.restore_application(&record);
            return Err(err.into());
        }

        info!(application_id = %application_id.0, driver_id = %driver.id.0, "driver hired");

        let mut details = BTreeMap::new();
        details.insert("driver_id".to_string(), driver.id.0.clone());
        self.notify(&record, "driver_hired", details);

        Ok(driver)
    }

    fn apply_status(
        &self,
        record: &ApplicationRecord,
        to: ApplicationStatus,
        reason: String,
        context: &AuditContext,
    ) -> Result<TransitionOutcome, HiringServiceError> {
        let from = record.status;
        if from == to {
            return Ok(TransitionOutcome::unchanged(to));
        }

        let now = self.clock.now();
        self.repository.update_application(
            &record.id,
            ApplicationPatch {
                status: Some(to),
                background_check: advance_background_check(
                    &record.background_check,
                    from,
                    to,
                    now,
                ),
                updated_at: Some(now),
                ..ApplicationPatch::default()
            },
        )?;

        let entry = LogEntry::new(LogAction::StatusChanged, context, now)
            .with_change("status", from, to)
            .with_metadata("reason", reason.clone());
        if let Err(err) = self
            .repository
            .append_log(&EntityRef::Application(record.id.clone()), entry)
        {
            self.restore_application(record);
            return Err(err.into());
        }

        info!(application_id = %record.id.0, %from, %to, %reason, "application status changed");

        if to.notifies_applicant() {
            let mut details = BTreeMap::new();
            details.insert("status".to_string(), to.label().to_string());
            details.insert("reason".to_string(), reason.clone());
            self.notify(record, "application_status_changed", details);
        }

        Ok(TransitionOutcome {
            success: true,
            previous_status: Some(from),
            new_status: to,
            message: reason,
            failure: None,
        })
    }

    /// Put back the status fields of `record` after its audit entry could not be written.
    fn restore_application(&self, record: &ApplicationRecord) {
        let restored = self.repository.update_application(
            &record.id,
            ApplicationPatch {
                status: Some(record.status),
                background_check: Some(record.background_check.clone()),
                updated_at: Some(record.updated_at),
                ..ApplicationPatch::default()
            },
        );
        if let Err(err) = restored {
            error!(
                application_id = %record.id.0,
                status = %record.status,
                error = %err,
                "status rollback failed"
            );
        }
    }

    fn settle_transition(
        &self,
        application_id: &ApplicationId,
        result: Result<TransitionOutcome, HiringServiceError>,
    ) -> TransitionOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(HiringServiceError::NoAutomaticTransition { status }) => TransitionOutcome {
                success: false,
                previous_status: Some(status),
                new_status: status,
                message: format!("No automatic transition from {status}"),
                failure: Some(FailureKind::NoAutomaticTransition),
            },
            Err(err) => {
                error!(application_id = %application_id.0, error = %err, "status transition failed");
                let stored = self
                    .repository
                    .fetch_application(application_id)
                    .ok()
                    .flatten()
                    .map(|record| record.status);
                TransitionOutcome {
                    success: false,
                    previous_status: stored,
                    new_status: ApplicationStatus::OnHold,
                    message: err.to_string(),
                    failure: Some(err.failure_kind()),
                }
            }
        }
    }

    fn ensure_history_accounted(
        &self,
        submission: &ApplicationSubmission,
    ) -> Result<(), HiringServiceError> {
        self.ensure_acknowledged(
            HistoryKind::Employment,
            &submission.jobs,
            submission.acknowledged_gaps.employment,
        )?;
        self.ensure_acknowledged(
            HistoryKind::Residency,
            &submission.addresses,
            submission.acknowledged_gaps.residency,
        )
    }

    fn ensure_acknowledged<T: Tenure>(
        &self,
        kind: HistoryKind,
        intervals: &[T],
        acknowledged: bool,
    ) -> Result<(), HiringServiceError> {
        let report = self.check_history(kind, intervals)?;
        if report.gap_detected && !acknowledged {
            return Err(HiringServiceError::UnacknowledgedGaps { kind, report });
        }
        Ok(())
    }

    fn fetch_required(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, HiringServiceError> {
        self.repository
            .fetch_application(application_id)?
            .ok_or_else(|| HiringServiceError::ApplicationNotFound(application_id.0.clone()))
    }

    fn notify(
        &self,
        record: &ApplicationRecord,
        template: &str,
        details: BTreeMap<String, String>,
    ) {
        let notification = HiringNotification {
            template: template.to_string(),
            application_id: record.id.clone(),
            recipient: record.profile.email.clone(),
            details,
        };

        if let Err(err) = self.notifications.publish(notification) {
            warn!(
                application_id = %record.id.0,
                template,
                error = %err,
                "notification not delivered"
            );
        }
    }
}

fn new_record(
    submission: ApplicationSubmission,
    status: ApplicationStatus,
    now: DateTime<Utc>,
) -> ApplicationRecord {
    ApplicationRecord {
        id: next_application_id(),
        company_id: submission.company_id,
        profile: submission.profile,
        addresses: submission.addresses,
        jobs: submission.jobs,
        documents: submission.documents,
        consents: submission.consents,
        acknowledged_gaps: submission.acknowledged_gaps,
        status,
        background_check: BackgroundCheck::default(),
        created_at: now,
        updated_at: now,
        logs: Vec::new(),
    }
}

fn signed_label(signed: bool) -> &'static str {
    if signed {
        "signed"
    } else {
        "unsigned"
    }
}

/// Mocked background-check bookkeeping driven by the status the application enters.
fn advance_background_check(
    current: &BackgroundCheck,
    from: ApplicationStatus,
    to: ApplicationStatus,
    now: DateTime<Utc>,
) -> Option<BackgroundCheck> {
    let mut next = current.clone();

    let moved_forward =
        to.is_screening_stage() || to == ApplicationStatus::BackgroundComplete;
    if from.is_screening_stage() && moved_forward {
        next.results.push(BackgroundCheckResult {
            stage: from.label().to_string(),
            outcome: "clear".to_string(),
            recorded_at: now,
        });
    }

    next.status = match to {
        ApplicationStatus::MvrCheck if current.status == BackgroundCheckStatus::NotStarted => {
            BackgroundCheckStatus::InProgress
        }
        ApplicationStatus::BackgroundComplete => BackgroundCheckStatus::Completed,
        ApplicationStatus::Rejected | ApplicationStatus::Disqualified
            if current.status == BackgroundCheckStatus::InProgress =>
        {
            BackgroundCheckStatus::Failed
        }
        _ => current.status,
    };

    if next == *current {
        None
    } else {
        Some(next)
    }
}

/// Why an engine operation did not succeed; drives the HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    NotFound,
    Precondition,
    NoAutomaticTransition,
    Infrastructure,
}

/// Discriminated result of a status change request.
///
/// A failed request reports `On Hold` as its safe `new_status` without writing it;
/// `previous_status` is then the status still stored, when the store could be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<ApplicationStatus>,
    pub new_status: ApplicationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl TransitionOutcome {
    fn unchanged(status: ApplicationStatus) -> Self {
        Self {
            success: true,
            previous_status: Some(status),
            new_status: status,
            message: format!("Status already {status}"),
            failure: None,
        }
    }
}

/// Discriminated result of a hire request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HireOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<DriverId>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

/// Error raised by the hiring service.
#[derive(Debug, thiserror::Error)]
pub enum HiringServiceError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("application {0} not found")]
    ApplicationNotFound(String),
    #[error("driver {0} not found")]
    DriverNotFound(String),
    #[error("Application must be approved before hiring")]
    NotApproved { status: ApplicationStatus },
    #[error("application is {status}, not a draft")]
    NotDraft { status: ApplicationStatus },
    #[error("no automatic transition from {status}")]
    NoAutomaticTransition { status: ApplicationStatus },
    #[error("{} history has unacknowledged gaps", kind.label())]
    UnacknowledgedGaps { kind: HistoryKind, report: GapReport },
}

impl HiringServiceError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            HiringServiceError::History(_) | HiringServiceError::UnacknowledgedGaps { .. } => {
                FailureKind::Validation
            }
            HiringServiceError::ApplicationNotFound(_)
            | HiringServiceError::DriverNotFound(_)
            | HiringServiceError::Repository(RepositoryError::NotFound) => FailureKind::NotFound,
            HiringServiceError::NotApproved { .. } | HiringServiceError::NotDraft { .. } => {
                FailureKind::Precondition
            }
            HiringServiceError::NoAutomaticTransition { .. } => FailureKind::NoAutomaticTransition,
            HiringServiceError::Repository(_) => FailureKind::Infrastructure,
        }
    }
}
