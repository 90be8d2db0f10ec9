use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use solar_ai::workflows::design::{
    design_router, DesignJobOrchestrator, DesignJobStore, EquipmentCatalog, PreferenceStore,
    SimulationEngine,
};

use crate::infra::AppState;

pub(crate) fn with_design_routes<C, E, J, P>(
    orchestrator: DesignJobOrchestrator<C, E, J, P>,
) -> axum::Router
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    design_router(orchestrator)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
