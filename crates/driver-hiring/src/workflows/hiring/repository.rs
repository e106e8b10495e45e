use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{EntityRef, LogEntry};
use super::domain::{
    AddressRecord, ApplicantProfile, ApplicationId, BackgroundCheck, CompanyId, Consents,
    DocumentPhotos, DriverId, DriverStatus, EmploymentRecord, GapAcknowledgement,
};
use super::history::Tenure;
use super::status::{available_transitions, ApplicationStatus};

/// Aggregate root persisted for every submitted or drafted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub company_id: CompanyId,
    pub profile: ApplicantProfile,
    pub addresses: Vec<AddressRecord>,
    pub jobs: Vec<EmploymentRecord>,
    pub documents: DocumentPhotos,
    pub consents: Consents,
    pub acknowledged_gaps: GapAcknowledgement,
    pub status: ApplicationStatus,
    pub background_check: BackgroundCheck,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl ApplicationRecord {
    /// Residence with the latest end month; the one copied onto a hired driver.
    pub fn current_address(&self) -> Option<&AddressRecord> {
        self.addresses
            .iter()
            .max_by_key(|address| address.ends().ok())
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            company_id: self.company_id.clone(),
            applicant_name: self.profile.full_name(),
            status: self.status.label(),
            background_check_status: self.background_check.status.label(),
            available_transitions: available_transitions(self.status)
                .iter()
                .map(|status| status.label())
                .collect(),
            can_hire: self.status == ApplicationStatus::Approved,
            log_entries: self.logs.len(),
        }
    }
}

/// Partial update applied by `HiringRepository::update_application`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationPatch {
    pub status: Option<ApplicationStatus>,
    pub background_check: Option<BackgroundCheck>,
    pub consents: Option<Consents>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ApplicationPatch {
    pub fn apply_to(self, record: &mut ApplicationRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(background_check) = self.background_check {
            record.background_check = background_check;
        }
        if let Some(consents) = self.consents {
            record.consents = consents;
        }
        if let Some(updated_at) = self.updated_at {
            record.updated_at = updated_at;
        }
    }
}

/// Driver materialized from an approved application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub id: DriverId,
    pub application_id: ApplicationId,
    pub company_id: CompanyId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub license_number: String,
    pub license_state: String,
    pub license_class: Option<String>,
    pub license_expiration: Option<chrono::NaiveDate>,
    pub address: Option<AddressRecord>,
    pub documents: DocumentPhotos,
    pub status: DriverStatus,
    pub hire_date: DateTime<Utc>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl DriverRecord {
    pub fn from_application(
        id: DriverId,
        application: &ApplicationRecord,
        hire_date: DateTime<Utc>,
    ) -> Self {
        let profile = &application.profile;
        Self {
            id,
            application_id: application.id.clone(),
            company_id: application.company_id.clone(),
            first_name: profile.first_name.clone(),
            middle_name: profile.middle_name.clone(),
            last_name: profile.last_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            date_of_birth: profile.date_of_birth,
            license_number: profile.license_number.clone(),
            license_state: profile.license_state.clone(),
            license_class: profile.license_class.clone(),
            license_expiration: profile.license_expiration,
            address: application.current_address().cloned(),
            documents: application.documents.clone(),
            status: DriverStatus::Active,
            hire_date,
            logs: Vec::new(),
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Implementations must offer read-your-writes consistency within a request. No
/// compare-and-set is required: concurrent writers to one application race and the
/// last write wins.
pub trait HiringRepository: Send + Sync {
    fn insert_application(
        &self,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError>;
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn update_application(
        &self,
        id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<(), RepositoryError>;
    fn applications_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    fn create_driver(&self, driver: DriverRecord) -> Result<DriverRecord, RepositoryError>;
    fn fetch_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, RepositoryError>;
    /// Driver already materialized from `application_id`, if any.
    fn driver_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<DriverRecord>, RepositoryError>;
    fn update_driver_status(&self, id: &DriverId, status: DriverStatus)
        -> Result<(), RepositoryError>;
    fn append_log(&self, entity: &EntityRef, entry: LogEntry) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound templated e-mail hook.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: HiringNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiringNotification {
    pub template: String,
    pub application_id: ApplicationId,
    pub recipient: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Admin-facing summary of an application's workflow position.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub company_id: CompanyId,
    pub applicant_name: String,
    pub status: &'static str,
    pub background_check_status: &'static str,
    pub available_transitions: Vec<&'static str>,
    pub can_hire: bool,
    pub log_entries: usize,
}
