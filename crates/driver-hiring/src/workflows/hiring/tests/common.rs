use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::HiringConfig;
use crate::workflows::hiring::audit::{EntityRef, LogEntry};
use crate::workflows::hiring::clock::FixedClock;
use crate::workflows::hiring::domain::{
    AddressRecord, ApplicantProfile, ApplicationId, ApplicationSubmission, BackgroundCheck,
    CompanyId, ConsentKind, ConsentRecord, Consents, DocumentPhotos, DriverId, DriverStatus,
    EmploymentRecord, GapAcknowledgement, SignatureRecord,
};
use crate::workflows::hiring::history::{MonthRange, YearMonth};
use crate::workflows::hiring::repository::{
    ApplicationPatch, ApplicationRecord, DriverRecord, HiringNotification, HiringRepository,
    NotificationError, NotificationPublisher, RepositoryError,
};
use crate::workflows::hiring::service::HiringService;
use crate::workflows::hiring::status::ApplicationStatus;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn today() -> YearMonth {
    YearMonth::new(2024, 1).expect("valid month")
}

pub(super) fn range(from: (i32, u32), to: (i32, u32)) -> MonthRange {
    MonthRange::new(from, to)
}

pub(super) fn job(employer: &str, from: (i32, u32), to: (i32, u32)) -> EmploymentRecord {
    EmploymentRecord {
        employer_name: employer.to_string(),
        position: "Driver".to_string(),
        contact_phone: Some("515-555-0100".to_string()),
        reason_for_leaving: None,
        subject_to_fmcsa: true,
        period: range(from, to),
    }
}

pub(super) fn address(street: &str, from: (i32, u32), to: (i32, u32)) -> AddressRecord {
    AddressRecord {
        street: street.to_string(),
        city: "Des Moines".to_string(),
        state: "IA".to_string(),
        postal_code: "50309".to_string(),
        period: range(from, to),
    }
}

pub(super) fn profile() -> ApplicantProfile {
    ApplicantProfile {
        first_name: "Jordan".to_string(),
        middle_name: None,
        last_name: "Reyes".to_string(),
        email: "jordan.reyes@example.com".to_string(),
        phone: "515-555-0142".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1988, 4, 2),
        license_number: "IA123456".to_string(),
        license_state: "IA".to_string(),
        license_class: Some("A".to_string()),
        license_expiration: NaiveDate::from_ymd_opt(2027, 4, 2),
    }
}

pub(super) fn signed_consent(kind: ConsentKind) -> ConsentRecord {
    ConsentRecord {
        consent_given: true,
        signature: SignatureRecord {
            uploaded: true,
            storage_key: Some(format!("signatures/app/{}.png", kind.label())),
            signed_at: Some(now()),
            ip_address: Some("203.0.113.7".to_string()),
            device_info: Some("Safari 17".to_string()),
        },
    }
}

pub(super) fn signed_consents() -> Consents {
    let mut consents = Consents::default();
    for kind in ConsentKind::ordered() {
        *consents.get_mut(kind) = signed_consent(kind);
    }
    consents
}

/// Complete submission whose history covers the 36 months ending January 2024.
pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        company_id: CompanyId("acme-freight".to_string()),
        profile: profile(),
        addresses: vec![address("12 Grand Ave", (2020, 6), (2024, 1))],
        jobs: vec![
            job("Hawkeye Logistics", (2022, 2), (2024, 1)),
            job("Prairie Haulers", (2021, 1), (2022, 1)),
        ],
        documents: DocumentPhotos {
            license_front: Some("docs/license-front.jpg".to_string()),
            license_back: Some("docs/license-back.jpg".to_string()),
            medical_card: Some("docs/medical-card.jpg".to_string()),
        },
        consents: signed_consents(),
        acknowledged_gaps: GapAcknowledgement::default(),
    }
}

pub(super) fn gapped_submission() -> ApplicationSubmission {
    let mut submission = submission();
    submission.jobs = vec![
        job("Hawkeye Logistics", (2023, 1), (2024, 1)),
        job("Prairie Haulers", (2020, 1), (2022, 6)),
    ];
    submission
}

pub(super) fn record(suffix: &str, status: ApplicationStatus) -> ApplicationRecord {
    let submission = submission();
    ApplicationRecord {
        id: ApplicationId(format!("app-{suffix}")),
        company_id: submission.company_id,
        profile: submission.profile,
        addresses: submission.addresses,
        jobs: submission.jobs,
        documents: submission.documents,
        consents: submission.consents,
        acknowledged_gaps: submission.acknowledged_gaps,
        status,
        background_check: BackgroundCheck::default(),
        created_at: now(),
        updated_at: now(),
        logs: Vec::new(),
    }
}

pub(super) fn hiring_config() -> HiringConfig {
    HiringConfig::default()
}

pub(super) fn build_service() -> (
    HiringService<MemoryRepository, MemoryNotifications>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = HiringService::with_clock(
        repository.clone(),
        notifications.clone(),
        hiring_config(),
        Arc::new(FixedClock(now())),
    );
    (service, repository, notifications)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) applications: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
    pub(super) drivers: Arc<Mutex<HashMap<DriverId, DriverRecord>>>,
    pub(super) company_logs: Arc<Mutex<HashMap<CompanyId, Vec<LogEntry>>>>,
}

impl MemoryRepository {
    pub(super) fn seed(&self, record: ApplicationRecord) -> ApplicationId {
        let id = record.id.clone();
        self.applications
            .lock()
            .expect("repository mutex poisoned")
            .insert(id.clone(), record);
        id
    }

    pub(super) fn application(&self, id: &ApplicationId) -> ApplicationRecord {
        self.applications
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
            .expect("application present")
    }

    pub(super) fn drivers(&self) -> Vec<DriverRecord> {
        self.drivers
            .lock()
            .expect("repository mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl HiringRepository for MemoryRepository {
    fn insert_application(
        &self,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.applications.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.applications.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_application(
        &self,
        id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.applications.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        patch.apply_to(record);
        Ok(())
    }

    fn applications_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.applications.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.company_id == company_id)
            .cloned()
            .collect())
    }

    fn create_driver(&self, driver: DriverRecord) -> Result<DriverRecord, RepositoryError> {
        let mut guard = self.drivers.lock().expect("repository mutex poisoned");
        if guard.contains_key(&driver.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(driver.id.clone(), driver.clone());
        Ok(driver)
    }

    fn fetch_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, RepositoryError> {
        let guard = self.drivers.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn driver_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<DriverRecord>, RepositoryError> {
        let guard = self.drivers.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|driver| &driver.application_id == application_id)
            .cloned())
    }

    fn update_driver_status(
        &self,
        id: &DriverId,
        status: DriverStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.drivers.lock().expect("repository mutex poisoned");
        let driver = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        driver.status = status;
        Ok(())
    }

    fn append_log(&self, entity: &EntityRef, entry: LogEntry) -> Result<(), RepositoryError> {
        match entity {
            EntityRef::Application(id) => {
                let mut guard = self.applications.lock().expect("repository mutex poisoned");
                let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
                record.logs.push(entry);
            }
            EntityRef::Driver(id) => {
                let mut guard = self.drivers.lock().expect("repository mutex poisoned");
                let driver = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
                driver.logs.push(entry);
            }
            EntityRef::Company(id) => {
                let mut guard = self.company_logs.lock().expect("repository mutex poisoned");
                guard.entry(id.clone()).or_default().push(entry);
            }
        }
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl HiringRepository for UnavailableRepository {
    fn insert_application(
        &self,
        _record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_application(
        &self,
        _id: &ApplicationId,
        _patch: ApplicationPatch,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications_for_company(
        &self,
        _company_id: &CompanyId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn create_driver(&self, _driver: DriverRecord) -> Result<DriverRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_driver(&self, _id: &DriverId) -> Result<Option<DriverRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn driver_for_application(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Option<DriverRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_driver_status(
        &self,
        _id: &DriverId,
        _status: DriverStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn append_log(&self, _entity: &EntityRef, _entry: LogEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Repository call that `FlakyRepository` can be told to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum RepositoryCall {
    UpdateApplication,
    CreateDriver,
    ApplicationLog,
    DriverLog,
}

/// In-memory store that fails chosen calls, for failures partway through an operation.
#[derive(Default, Clone)]
pub(super) struct FlakyRepository {
    pub(super) store: MemoryRepository,
    pending: Arc<Mutex<HashMap<RepositoryCall, usize>>>,
}

impl FlakyRepository {
    /// Fail the next `call`; repeat to fail several in a row.
    pub(super) fn fail_next(&self, call: RepositoryCall) {
        *self
            .pending
            .lock()
            .expect("repository mutex poisoned")
            .entry(call)
            .or_default() += 1;
    }

    fn attempt(&self, call: RepositoryCall) -> Result<(), RepositoryError> {
        let mut pending = self.pending.lock().expect("repository mutex poisoned");
        match pending.get_mut(&call) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(RepositoryError::Unavailable(format!("{call:?} dropped")))
            }
            _ => Ok(()),
        }
    }
}

impl HiringRepository for FlakyRepository {
    fn insert_application(
        &self,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        self.store.insert_application(record)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.store.fetch_application(id)
    }

    fn update_application(
        &self,
        id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<(), RepositoryError> {
        self.attempt(RepositoryCall::UpdateApplication)?;
        self.store.update_application(id, patch)
    }

    fn applications_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.store.applications_for_company(company_id)
    }

    fn create_driver(&self, driver: DriverRecord) -> Result<DriverRecord, RepositoryError> {
        self.attempt(RepositoryCall::CreateDriver)?;
        self.store.create_driver(driver)
    }

    fn fetch_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, RepositoryError> {
        self.store.fetch_driver(id)
    }

    fn driver_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<DriverRecord>, RepositoryError> {
        self.store.driver_for_application(application_id)
    }

    fn update_driver_status(
        &self,
        id: &DriverId,
        status: DriverStatus,
    ) -> Result<(), RepositoryError> {
        self.store.update_driver_status(id, status)
    }

    fn append_log(&self, entity: &EntityRef, entry: LogEntry) -> Result<(), RepositoryError> {
        match entity {
            EntityRef::Application(_) => self.attempt(RepositoryCall::ApplicationLog)?,
            EntityRef::Driver(_) => self.attempt(RepositoryCall::DriverLog)?,
            EntityRef::Company(_) => {}
        }
        self.store.append_log(entity, entry)
    }
}

pub(super) fn build_flaky_service() -> (
    HiringService<FlakyRepository, MemoryNotifications>,
    Arc<FlakyRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(FlakyRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = HiringService::with_clock(
        repository.clone(),
        notifications.clone(),
        hiring_config(),
        Arc::new(FixedClock(now())),
    );
    (service, repository, notifications)
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<HiringNotification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<HiringNotification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }

    pub(super) fn templates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.template)
            .collect()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: HiringNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifications;

impl NotificationPublisher for OfflineNotifications {
    fn publish(&self, _notification: HiringNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
