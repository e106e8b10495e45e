use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryHiringRepository, InMemoryNotificationPublisher};
use crate::routes::with_hiring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use driver_hiring::config::AppConfig;
use driver_hiring::error::AppError;
use driver_hiring::telemetry;
use driver_hiring::workflows::hiring::HiringService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryHiringRepository::default());
    let notifications = Arc::new(InMemoryNotificationPublisher::default());
    let hiring_service = Arc::new(HiringService::new(
        repository,
        notifications,
        config.hiring,
    ));

    let app = with_hiring_routes(hiring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        employment_lookback_months = config.hiring.employment_lookback_months,
        residency_lookback_months = config.hiring.residency_lookback_months,
        require_psp_review = config.hiring.require_psp_review,
        "driver hiring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
