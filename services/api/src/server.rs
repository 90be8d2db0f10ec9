use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use solar_ai::config::AppConfig;
use solar_ai::error::AppError;
use solar_ai::telemetry;
use solar_ai::workflows::design::{ClimateModelEngine, DesignJobOrchestrator, ScoringConfig};
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryDesignJobStore, InMemoryEquipmentCatalog, InMemoryPreferenceStore,
};
use crate::routes::with_design_routes;

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

    let orchestrator = DesignJobOrchestrator::new(
        InMemoryEquipmentCatalog::default(),
        ClimateModelEngine,
        InMemoryDesignJobStore::default(),
        InMemoryPreferenceStore::default(),
        ScoringConfig::default(),
        config.pipeline.clone(),
    );

    let app = with_design_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "solar design orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
