use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::audit::AuditContext;
use super::domain::{
    ApplicationId, ApplicationSubmission, CompanyId, ConsentKind, ConsentRecord, DriverId,
    DriverStatus,
};
use super::export::write_applications_csv;
use super::history::{HistoryKind, MonthRange};
use super::repository::{HiringRepository, NotificationPublisher};
use super::service::{FailureKind, HiringService, HiringServiceError};
use super::status::ApplicationStatus;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub submission: ApplicationSubmission,
    #[serde(default)]
    pub context: AuditContext,
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContextRequest {
    #[serde(default)]
    pub context: AuditContext,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    #[serde(default)]
    pub target_status: Option<ApplicationStatus>,
    #[serde(default)]
    pub context: AuditContext,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub context: AuditContext,
}

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub kind: ConsentKind,
    pub consent: ConsentRecord,
    #[serde(default)]
    pub context: AuditContext,
}

#[derive(Debug, Deserialize)]
pub struct DriverStatusRequest {
    pub status: DriverStatus,
    #[serde(default)]
    pub context: AuditContext,
}

#[derive(Debug, Deserialize)]
pub struct GapCheckRequest {
    pub kind: HistoryKind,
    pub intervals: Vec<MonthRange>,
}

/// Router builder exposing the applicant and back-office endpoints.
pub fn hiring_router<R, N>(service: Arc<HiringService<R, N>>) -> Router
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<R, N>))
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/transitions",
            get(transitions_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/transition",
            post(transition_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            put(set_status_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/consents",
            post(consent_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/hire",
            post(hire_handler::<R, N>),
        )
        .route("/api/v1/drivers/:driver_id", get(driver_handler::<R, N>))
        .route(
            "/api/v1/drivers/:driver_id/status",
            put(driver_status_handler::<R, N>),
        )
        .route("/api/v1/history/gaps", post(gap_check_handler::<R, N>))
        .route(
            "/api/v1/companies/:company_id/applications.csv",
            get(export_handler::<R, N>),
        )
        .with_state(service)
}

pub(crate) fn failure_status(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Validation => StatusCode::BAD_REQUEST,
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Precondition | FailureKind::NoAutomaticTransition => StatusCode::CONFLICT,
        FailureKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: HiringServiceError) -> Response {
    match error {
        HiringServiceError::UnacknowledgedGaps { kind, report } => {
            let payload = json!({
                "error": format!("{} history has unacknowledged gaps", kind.label()),
                "kind": kind,
                "report": report,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({
                "error": other.to_string(),
            });
            (failure_status(other.failure_kind()), axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = if request.draft {
        service.save_draft(request.submission, &request.context)
    } else {
        service.submit(request.submission, &request.context)
    };

    match result {
        Ok(record) => (StatusCode::ACCEPTED, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transitions_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let outcome = service.process_status_transition(
        &ApplicationId(application_id),
        request.target_status,
        &request.context,
    );
    let status = outcome.failure.map(failure_status).unwrap_or(StatusCode::OK);
    (status, axum::Json(outcome)).into_response()
}

pub(crate) async fn set_status_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let outcome = service.set_status(
        &ApplicationId(application_id),
        request.status,
        &request.context,
    );
    let status = outcome.failure.map(failure_status).unwrap_or(StatusCode::OK);
    (status, axum::Json(outcome)).into_response()
}

pub(crate) async fn consent_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ConsentRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.record_consent(
        &ApplicationId(application_id),
        request.kind,
        request.consent,
        &request.context,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hire_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ContextRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let outcome = service.hire_driver(&ApplicationId(application_id), &request.context);
    let status = match outcome.failure {
        Some(kind) => failure_status(kind),
        None => StatusCode::CREATED,
    };
    (status, axum::Json(outcome)).into_response()
}

pub(crate) async fn driver_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(driver_id): Path<String>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.driver(&DriverId(driver_id)) {
        Ok(driver) => (StatusCode::OK, axum::Json(driver)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn driver_status_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(driver_id): Path<String>,
    axum::Json(request): axum::Json<DriverStatusRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.set_driver_status(&DriverId(driver_id), request.status, &request.context) {
        Ok(driver) => (StatusCode::OK, axum::Json(driver)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn gap_check_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    axum::Json(request): axum::Json<GapCheckRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.check_history(request.kind, &request.intervals) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error.into()),
    }
}

pub(crate) async fn export_handler<R, N>(
    State(service): State<Arc<HiringService<R, N>>>,
    Path(company_id): Path<String>,
) -> Response
where
    R: HiringRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let records = match service.applications_for_company(&CompanyId(company_id)) {
        Ok(records) => records,
        Err(error) => return error_response(error),
    };

    let mut buffer = Vec::new();
    match write_applications_csv(&mut buffer, &records) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref())],
            buffer,
        )
            .into_response(),
        Err(err) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
