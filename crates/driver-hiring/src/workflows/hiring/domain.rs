use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::history::{MonthRange, Tenure};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for hired drivers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverId(pub String);

/// Tenant scope owning applications and drivers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyId(pub String);

/// Personal, contact and license details collected on the first form step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub license_number: String,
    pub license_state: String,
    #[serde(default)]
    pub license_class: Option<String>,
    #[serde(default)]
    pub license_expiration: Option<NaiveDate>,
}

impl ApplicantProfile {
    /// Names of required fields left blank, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let blank = |value: &str| value.trim().is_empty();
        let required = [
            ("first_name", blank(&self.first_name)),
            ("last_name", blank(&self.last_name)),
            ("email", blank(&self.email)),
            ("phone", blank(&self.phone)),
            ("date_of_birth", self.date_of_birth.is_none()),
            ("license_number", blank(&self.license_number)),
            ("license_state", blank(&self.license_state)),
        ];

        required
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().map(str::trim) {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// One residence reported in the address history step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(flatten)]
    pub period: MonthRange,
}

impl Tenure for AddressRecord {
    fn range(&self) -> MonthRange {
        self.period
    }
}

/// One job reported in the employment history step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentRecord {
    pub employer_name: String,
    pub position: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub reason_for_leaving: Option<String>,
    #[serde(default)]
    pub subject_to_fmcsa: bool,
    #[serde(flatten)]
    pub period: MonthRange,
}

impl Tenure for EmploymentRecord {
    fn range(&self) -> MonthRange {
        self.period
    }
}

/// Storage keys for uploaded document photos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPhotos {
    #[serde(default)]
    pub license_front: Option<String>,
    #[serde(default)]
    pub license_back: Option<String>,
    #[serde(default)]
    pub medical_card: Option<String>,
}

/// The five background-check disclosures an applicant signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentKind {
    FairCreditReporting,
    MotorVehicleRecord,
    DrugAndAlcoholTesting,
    ClearinghouseQuery,
    PspDisclosure,
}

impl ConsentKind {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::FairCreditReporting,
            Self::MotorVehicleRecord,
            Self::DrugAndAlcoholTesting,
            Self::ClearinghouseQuery,
            Self::PspDisclosure,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FairCreditReporting => "fair_credit_reporting",
            Self::MotorVehicleRecord => "motor_vehicle_record",
            Self::DrugAndAlcoholTesting => "drug_and_alcohol_testing",
            Self::ClearinghouseQuery => "clearinghouse_query",
            Self::PspDisclosure => "psp_disclosure",
        }
    }
}

/// Uploaded signature image backing a consent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub uploaded: bool,
    #[serde(default)]
    pub storage_key: Option<String>,
    #[serde(default)]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub device_info: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub consent_given: bool,
    #[serde(default)]
    pub signature: SignatureRecord,
}

impl ConsentRecord {
    pub fn is_signed(&self) -> bool {
        self.consent_given && self.signature.uploaded
    }
}

/// One consent slot per disclosure; no string-keyed lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consents {
    #[serde(default)]
    pub fair_credit_reporting: ConsentRecord,
    #[serde(default)]
    pub motor_vehicle_record: ConsentRecord,
    #[serde(default)]
    pub drug_and_alcohol_testing: ConsentRecord,
    #[serde(default)]
    pub clearinghouse_query: ConsentRecord,
    #[serde(default)]
    pub psp_disclosure: ConsentRecord,
}

impl Consents {
    pub fn get(&self, kind: ConsentKind) -> &ConsentRecord {
        match kind {
            ConsentKind::FairCreditReporting => &self.fair_credit_reporting,
            ConsentKind::MotorVehicleRecord => &self.motor_vehicle_record,
            ConsentKind::DrugAndAlcoholTesting => &self.drug_and_alcohol_testing,
            ConsentKind::ClearinghouseQuery => &self.clearinghouse_query,
            ConsentKind::PspDisclosure => &self.psp_disclosure,
        }
    }

    pub fn get_mut(&mut self, kind: ConsentKind) -> &mut ConsentRecord {
        match kind {
            ConsentKind::FairCreditReporting => &mut self.fair_credit_reporting,
            ConsentKind::MotorVehicleRecord => &mut self.motor_vehicle_record,
            ConsentKind::DrugAndAlcoholTesting => &mut self.drug_and_alcohol_testing,
            ConsentKind::ClearinghouseQuery => &mut self.clearinghouse_query,
            ConsentKind::PspDisclosure => &mut self.psp_disclosure,
        }
    }

    pub fn unsigned(&self) -> Vec<ConsentKind> {
        ConsentKind::ordered()
            .into_iter()
            .filter(|kind| !self.get(*kind).is_signed())
            .collect()
    }
}

/// Applicant confirmations that reported history gaps are intentional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapAcknowledgement {
    #[serde(default)]
    pub employment: bool,
    #[serde(default)]
    pub residency: bool,
}

/// Everything the multi-step form posts on submission or draft save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub company_id: CompanyId,
    pub profile: ApplicantProfile,
    pub addresses: Vec<AddressRecord>,
    pub jobs: Vec<EmploymentRecord>,
    #[serde(default)]
    pub documents: DocumentPhotos,
    #[serde(default)]
    pub consents: Consents,
    #[serde(default)]
    pub acknowledged_gaps: GapAcknowledgement,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundCheckStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl BackgroundCheckStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Result recorded by the mocked background-check provider for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundCheckResult {
    pub stage: String,
    pub outcome: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundCheck {
    pub status: BackgroundCheckStatus,
    #[serde(default)]
    pub results: Vec<BackgroundCheckResult>,
}

/// Employment state of a hired driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Active,
    OutOfDuty,
    NoLongerEmployed,
}

impl DriverStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DriverStatus::Active => "active",
            DriverStatus::OutOfDuty => "out_of_duty",
            DriverStatus::NoLongerEmployed => "no_longer_employed",
        }
    }
}
