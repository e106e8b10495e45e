//! End-to-end scenarios for the driver hiring workflow, driven through the public service
//! facade and HTTP router only.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use driver_hiring::config::HiringConfig;
    use driver_hiring::workflows::hiring::{
        AddressRecord, ApplicantProfile, ApplicationId, ApplicationPatch, ApplicationRecord,
        ApplicationSubmission, CompanyId, ConsentKind, ConsentRecord, Consents, DocumentPhotos,
        DriverId, DriverRecord, DriverStatus, EmploymentRecord, EntityRef, FixedClock,
        GapAcknowledgement, HiringNotification, HiringRepository, HiringService, LogEntry,
        MonthRange, NotificationError, NotificationPublisher, RepositoryError, SignatureRecord,
    };

    pub(super) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn signed(kind: ConsentKind) -> ConsentRecord {
        ConsentRecord {
            consent_given: true,
            signature: SignatureRecord {
                uploaded: true,
                storage_key: Some(format!("signatures/{}.png", kind.label())),
                signed_at: Some(now()),
                ip_address: None,
                device_info: None,
            },
        }
    }

    pub(super) fn submission() -> ApplicationSubmission {
        let mut consents = Consents::default();
        for kind in ConsentKind::ordered() {
            *consents.get_mut(kind) = signed(kind);
        }

        ApplicationSubmission {
            company_id: CompanyId("lakeside-transport".to_string()),
            profile: ApplicantProfile {
                first_name: "Avery".to_string(),
                middle_name: Some("Lee".to_string()),
                last_name: "Nakamura".to_string(),
                email: "avery.nakamura@example.com".to_string(),
                phone: "612-555-0199".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1991, 9, 12),
                license_number: "MN9988776".to_string(),
                license_state: "MN".to_string(),
                license_class: Some("A".to_string()),
                license_expiration: NaiveDate::from_ymd_opt(2028, 9, 12),
            },
            addresses: vec![
                AddressRecord {
                    street: "400 Lake St".to_string(),
                    city: "Minneapolis".to_string(),
                    state: "MN".to_string(),
                    postal_code: "55408".to_string(),
                    period: MonthRange::new((2022, 3), (2024, 1)),
                },
                AddressRecord {
                    street: "18 River Rd".to_string(),
                    city: "St. Paul".to_string(),
                    state: "MN".to_string(),
                    postal_code: "55102".to_string(),
                    period: MonthRange::new((2019, 5), (2022, 2)),
                },
            ],
            jobs: vec![EmploymentRecord {
                employer_name: "North Star Freight".to_string(),
                position: "OTR Driver".to_string(),
                contact_phone: None,
                reason_for_leaving: None,
                subject_to_fmcsa: true,
                period: MonthRange::new((2019, 1), (2024, 1)),
            }],
            documents: DocumentPhotos::default(),
            consents,
            acknowledged_gaps: GapAcknowledgement::default(),
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryRepository {
        applications: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
        drivers: Arc<Mutex<HashMap<DriverId, DriverRecord>>>,
    }

    impl HiringRepository for MemoryRepository {
        fn insert_application(
            &self,
            record: ApplicationRecord,
        ) -> Result<ApplicationRecord, RepositoryError> {
            let mut guard = self.applications.lock().expect("mutex poisoned");
            guard.insert(record.id.clone(), record.clone());
            Ok(record)
        }

        fn fetch_application(
            &self,
            id: &ApplicationId,
        ) -> Result<Option<ApplicationRecord>, RepositoryError> {
            Ok(self.applications.lock().expect("mutex poisoned").get(id).cloned())
        }

        fn update_application(
            &self,
            id: &ApplicationId,
            patch: ApplicationPatch,
        ) -> Result<(), RepositoryError> {
            let mut guard = self.applications.lock().expect("mutex poisoned");
            let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            patch.apply_to(record);
            Ok(())
        }

        fn applications_for_company(
            &self,
            company_id: &CompanyId,
        ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
            let guard = self.applications.lock().expect("mutex poisoned");
            Ok(guard
                .values()
                .filter(|record| &record.company_id == company_id)
                .cloned()
                .collect())
        }

        fn create_driver(&self, driver: DriverRecord) -> Result<DriverRecord, RepositoryError> {
            let mut guard = self.drivers.lock().expect("mutex poisoned");
            guard.insert(driver.id.clone(), driver.clone());
            Ok(driver)
        }

        fn fetch_driver(&self, id: &DriverId) -> Result<Option<DriverRecord>, RepositoryError> {
            Ok(self.drivers.lock().expect("mutex poisoned").get(id).cloned())
        }

        fn driver_for_application(
            &self,
            application_id: &ApplicationId,
        ) -> Result<Option<DriverRecord>, RepositoryError> {
            let guard = self.drivers.lock().expect("mutex poisoned");
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
            let mut guard = self.drivers.lock().expect("mutex poisoned");
            let driver = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            driver.status = status;
            Ok(())
        }

        fn append_log(&self, entity: &EntityRef, entry: LogEntry) -> Result<(), RepositoryError> {
            match entity {
                EntityRef::Application(id) => {
                    let mut guard = self.applications.lock().expect("mutex poisoned");
                    let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
                    record.logs.push(entry);
                }
                EntityRef::Driver(id) => {
                    let mut guard = self.drivers.lock().expect("mutex poisoned");
                    let driver = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
                    driver.logs.push(entry);
                }
                EntityRef::Company(_) => {}
            }
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryNotifications {
        events: Arc<Mutex<Vec<HiringNotification>>>,
    }

    impl MemoryNotifications {
        pub(super) fn events(&self) -> Vec<HiringNotification> {
            self.events.lock().expect("mutex poisoned").clone()
        }
    }

    impl NotificationPublisher for MemoryNotifications {
        fn publish(&self, notification: HiringNotification) -> Result<(), NotificationError> {
            self.events.lock().expect("mutex poisoned").push(notification);
            Ok(())
        }
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
            HiringConfig::default(),
            Arc::new(FixedClock(now())),
        );
        (service, repository, notifications)
    }
}

mod history {
    use super::common::*;
    use driver_hiring::workflows::hiring::{HiringServiceError, HistoryKind, MonthRange};

    #[test]
    fn service_checks_history_against_the_current_month() {
        let (service, _, _) = build_service();
        let intervals = vec![
            MonthRange::new((2022, 1), (2022, 6)),
            MonthRange::new((2023, 1), (2023, 12)),
        ];

        let report = service
            .check_history(HistoryKind::Employment, &intervals)
            .expect("valid history");

        assert!(report.gap_detected);
        assert_eq!(report.periods.len(), 1);
        assert_eq!(report.periods[0].from.to_string(), "2022-07");
        assert_eq!(report.periods[0].to.to_string(), "2022-12");
    }

    #[test]
    fn residency_gap_blocks_submission_until_acknowledged() {
        let (service, _, _) = build_service();
        let mut gapped = submission();
        gapped.addresses.remove(0);

        match service.submit(gapped.clone(), &Default::default()) {
            Err(HiringServiceError::UnacknowledgedGaps { kind, report }) => {
                assert_eq!(kind, HistoryKind::Residency);
                assert_eq!(report.periods[0].from.to_string(), "2022-03");
                assert_eq!(report.periods[0].to.to_string(), "2023-12");
            }
            other => panic!("expected residency gap, got {other:?}"),
        }

        gapped.acknowledged_gaps.residency = true;
        service
            .submit(gapped, &Default::default())
            .expect("acknowledged gap accepted");
    }
}

mod lifecycle {
    use super::common::*;
    use driver_hiring::workflows::hiring::{
        ApplicationStatus, AuditContext, BackgroundCheckStatus, HiringRepository, LogAction,
    };

    #[test]
    fn clean_application_is_screened_approved_and_hired() {
        let (service, repository, notifications) = build_service();
        let operator = AuditContext::operator("ops-1", "ops@lakeside.example");
        let record = service
            .submit(submission(), &AuditContext::default())
            .expect("submission accepted");

        let mut statuses = Vec::new();
        loop {
            let outcome = service.process_status_transition(&record.id, None, &operator);
            if !outcome.success {
                break;
            }
            statuses.push(outcome.new_status);
        }
        assert_eq!(
            statuses,
            vec![
                ApplicationStatus::UnderReview,
                ApplicationStatus::MvrCheck,
                ApplicationStatus::DrugScreening,
                ApplicationStatus::BackgroundComplete,
                ApplicationStatus::Approved,
            ]
        );

        let hire = service.hire_driver(&record.id, &operator);
        assert!(hire.success, "{hire:?}");
        let driver = service
            .driver(&hire.driver_id.expect("driver id"))
            .expect("driver stored");
        assert_eq!(driver.address.expect("address").street, "400 Lake St");
        assert_eq!(driver.middle_name.as_deref(), Some("Lee"));

        let stored = repository
            .fetch_application(&record.id)
            .expect("repo fetch")
            .expect("record present");
        assert_eq!(stored.status, ApplicationStatus::Hired);
        assert_eq!(
            stored.background_check.status,
            BackgroundCheckStatus::Completed
        );
        let actions: Vec<LogAction> = stored.logs.iter().map(|entry| entry.action).collect();
        assert_eq!(
            actions,
            vec![
                LogAction::Submitted,
                LogAction::StatusChanged,
                LogAction::StatusChanged,
                LogAction::StatusChanged,
                LogAction::StatusChanged,
                LogAction::StatusChanged,
                LogAction::Hired,
            ]
        );

        let templates: Vec<String> = notifications
            .events()
            .into_iter()
            .map(|event| event.template)
            .collect();
        assert_eq!(
            templates,
            vec![
                "application_received",
                "application_status_changed",
                "driver_hired"
            ]
        );
    }
}

mod routing {
    use super::common::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use driver_hiring::workflows::hiring::hiring_router;

    async fn read_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn submitted_application_is_visible_through_the_api() {
        let (service, _, _) = build_service();
        let router = hiring_router(Arc::new(service));

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/applications")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "submission": submission() }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let view = read_json(response).await;
        let application_id = view["application_id"]
            .as_str()
            .expect("application id")
            .to_string();

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/applications/{application_id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        let record = read_json(response).await;
        assert_eq!(record["status"], "New");
        assert_eq!(record["profile"]["last_name"], "Nakamura");
        assert_eq!(record["logs"][0]["action"], "submitted");
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let (service, _, _) = build_service();

        let response = hiring_router(Arc::new(service))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/applications/app-404404")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
