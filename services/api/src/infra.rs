use chrono::NaiveDate;
use driver_hiring::workflows::hiring::{
    ApplicationId, ApplicationPatch, ApplicationRecord, CompanyId, DriverId, DriverRecord,
    DriverStatus, EntityRef, HiringNotification, HiringRepository, LogEntry, NotificationError,
    NotificationPublisher, RepositoryError, YearMonth,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryHiringRepository {
    applications: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
    drivers: Arc<Mutex<HashMap<DriverId, DriverRecord>>>,
    company_logs: Arc<Mutex<HashMap<CompanyId, Vec<LogEntry>>>>,
}

impl HiringRepository for InMemoryHiringRepository {
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

/// Records outbound e-mails instead of sending them.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationPublisher {
    events: Arc<Mutex<Vec<HiringNotification>>>,
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, notification: HiringNotification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            application_id = %notification.application_id.0,
            "notification queued"
        );
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotificationPublisher {
    pub(crate) fn events(&self) -> Vec<HiringNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_month(raw: &str) -> Result<YearMonth, String> {
    let (year, month) = raw
        .trim()
        .split_once('-')
        .ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM"))?;
    let year = year
        .parse::<i32>()
        .map_err(|err| format!("invalid year in '{raw}' ({err})"))?;
    let month = month
        .parse::<u32>()
        .map_err(|err| format!("invalid month in '{raw}' ({err})"))?;
    YearMonth::new(year, month).map_err(|err| err.to_string())
}
