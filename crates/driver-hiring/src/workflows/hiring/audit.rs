use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, CompanyId, DriverId};

static LOG_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_log_id() -> String {
    let id = LOG_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("log-{id:06}")
}

/// Actor attribution threaded into every audit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub device_info: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AuditContext {
    pub fn operator(user_id: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            user_email: Some(user_email.into()),
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Operator notes when present and non-blank, otherwise `fallback`.
    pub fn reason_or(&self, fallback: &str) -> String {
        match self.notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => notes.to_string(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Submitted,
    StatusChanged,
    ConsentRecorded,
    Hired,
    Created,
    DriverStatusChanged,
}

impl LogAction {
    pub const fn label(self) -> &'static str {
        match self {
            LogAction::Submitted => "submitted",
            LogAction::StatusChanged => "status_changed",
            LogAction::ConsentRecorded => "consent_recorded",
            LogAction::Hired => "hired",
            LogAction::Created => "created",
            LogAction::DriverStatusChanged => "driver_status_changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: String,
    pub to: String,
}

/// Immutable audit record appended to an entity's `logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub action: LogAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changes: BTreeMap<String, FieldChange>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(action: LogAction, context: &AuditContext, created_at: DateTime<Utc>) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(ip) = &context.ip_address {
            metadata.insert("ip_address".to_string(), ip.clone());
        }
        if let Some(device) = &context.device_info {
            metadata.insert("device_info".to_string(), device.clone());
        }

        Self {
            id: next_log_id(),
            action,
            user_id: context.user_id.clone(),
            user_email: context.user_email.clone(),
            changes: BTreeMap::new(),
            metadata,
            success: true,
            error_message: None,
            created_at,
        }
    }

    pub fn with_change(
        mut self,
        field: &str,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        self.changes.insert(
            field.to_string(),
            FieldChange {
                from: from.to_string(),
                to: to.to_string(),
            },
        );
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn reason(&self) -> Option<&str> {
        self.metadata.get("reason").map(String::as_str)
    }

    pub fn status_change(&self) -> Option<&FieldChange> {
        self.changes.get("status")
    }
}

/// Entity whose `logs` array receives an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
    Application(ApplicationId),
    Driver(DriverId),
    Company(CompanyId),
}

impl EntityRef {
    pub const fn kind(&self) -> &'static str {
        match self {
            EntityRef::Application(_) => "application",
            EntityRef::Driver(_) => "driver",
            EntityRef::Company(_) => "company",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityRef::Application(id) => &id.0,
            EntityRef::Driver(id) => &id.0,
            EntityRef::Company(id) => &id.0,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}
