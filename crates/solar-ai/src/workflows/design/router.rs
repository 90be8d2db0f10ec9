use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::catalog::EquipmentCatalog;
use super::domain::{DesignJobId, DesignRequirements, EquipmentSelections};
use super::orchestrator::{DesignJobOrchestrator, DesignServiceError};
use super::preferences::{PreferenceStore, UserPreferences};
use super::repository::{DesignJobRecord, DesignJobStore, StoreError};
use super::simulation::SimulationEngine;

const DEFAULT_PAGE_LIMIT: usize = 20;
const MAX_PAGE_LIMIT: usize = 100;

/// Router builder exposing the polling HTTP surface of the design pipeline.
pub fn design_router<C, E, J, P>(orchestrator: DesignJobOrchestrator<C, E, J, P>) -> Router
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/designs",
            post(submit_handler::<C, E, J, P>).get(list_handler::<C, E, J, P>),
        )
        .route(
            "/api/v1/designs/:design_id",
            get(get_handler::<C, E, J, P>).put(review_handler::<C, E, J, P>),
        )
        .route(
            "/api/v1/designs/:design_id/cancel",
            post(cancel_handler::<C, E, J, P>),
        )
        .route(
            "/api/v1/compatibility/panel/:panel_id/inverter/:inverter_id",
            get(compatibility_handler::<C, E, J, P>),
        )
        .route(
            "/api/v1/preferences",
            get(get_preferences_handler::<C, E, J, P>)
                .put(put_preferences_handler::<C, E, J, P>),
        )
        .with_state(orchestrator)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Serialize)]
struct JobSummary {
    id: DesignJobId,
    status: &'static str,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    target_power_w: f64,
    confidence_score: Option<u8>,
}

impl JobSummary {
    fn from_record(record: &DesignJobRecord) -> Self {
        Self {
            id: record.id.clone(),
            status: record.status.label(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            target_power_w: record.requirements.target_power_w,
            confidence_score: record.confidence_score,
        }
    }
}

pub(crate) async fn submit_handler<C, E, J, P>(
    State(orchestrator): State<DesignJobOrchestrator<C, E, J, P>>,
    axum::Json(requirements): axum::Json<DesignRequirements>,
) -> Response
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    match orchestrator.submit(requirements) {
        Ok(record) => {
            let payload = json!({
                "id": record.id,
                "status": record.status.label(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(DesignServiceError::Validation(error)) => {
            let payload = json!({
                "error": "invalid design requirements",
                "violations": error.violations,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn list_handler<C, E, J, P>(
    State(orchestrator): State<DesignJobOrchestrator<C, E, J, P>>,
    Query(params): Query<ListParams>,
) -> Response
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    match orchestrator.list(page, limit) {
        Ok((records, total)) => {
            let jobs: Vec<JobSummary> = records.iter().map(JobSummary::from_record).collect();
            let payload = json!({
                "jobs": jobs,
                "total": total,
                "page": page,
                "limit": limit,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn get_handler<C, E, J, P>(
    State(orchestrator): State<DesignJobOrchestrator<C, E, J, P>>,
    Path(design_id): Path<String>,
) -> Response
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    let id = DesignJobId(design_id);
    match orchestrator.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(DesignServiceError::NotFound(_)) => not_found(&id),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn review_handler<C, E, J, P>(
    State(orchestrator): State<DesignJobOrchestrator<C, E, J, P>>,
    Path(design_id): Path<String>,
    axum::Json(selections): axum::Json<EquipmentSelections>,
) -> Response
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    let id = DesignJobId(design_id);
    match orchestrator.apply_review(&id, selections) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(DesignServiceError::NotFound(_)) => not_found(&id),
        Err(DesignServiceError::ReviewConflict(_)) => {
            let payload = json!({
                "error": "design job has not finished; amendments require a terminal job",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(DesignServiceError::UnknownEquipment(equipment_id)) => {
            let payload = json!({
                "error": format!("unknown equipment id: {equipment_id}"),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn cancel_handler<C, E, J, P>(
    State(orchestrator): State<DesignJobOrchestrator<C, E, J, P>>,
    Path(design_id): Path<String>,
) -> Response
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    let id = DesignJobId(design_id);
    match orchestrator.cancel(&id) {
        Ok(record) => {
            let payload = json!({
                "id": record.id,
                "status": record.status.label(),
                "cancel_requested": record.cancel_requested,
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(DesignServiceError::Store(StoreError::NotFound(_))) => not_found(&id),
        Err(DesignServiceError::Store(StoreError::Conflict(_))) => {
            let payload = json!({
                "error": "design job already reached a terminal state",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn compatibility_handler<C, E, J, P>(
    State(orchestrator): State<DesignJobOrchestrator<C, E, J, P>>,
    Path((panel_id, inverter_id)): Path<(String, String)>,
) -> Response
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    match orchestrator.compatibility(&panel_id, &inverter_id) {
        Ok(entry) => (StatusCode::OK, axum::Json(entry.as_ref().clone())).into_response(),
        Err(DesignServiceError::UnknownEquipment(equipment_id)) => {
            let payload = json!({
                "error": format!("unknown equipment id: {equipment_id}"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn get_preferences_handler<C, E, J, P>(
    State(orchestrator): State<DesignJobOrchestrator<C, E, J, P>>,
) -> Response
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    match orchestrator.preferences() {
        Ok(preferences) => (StatusCode::OK, axum::Json(preferences)).into_response(),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn put_preferences_handler<C, E, J, P>(
    State(orchestrator): State<DesignJobOrchestrator<C, E, J, P>>,
    axum::Json(preferences): axum::Json<UserPreferences>,
) -> Response
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    match orchestrator.save_preferences(preferences) {
        Ok(saved) => (StatusCode::OK, axum::Json(saved)).into_response(),
        Err(other) => internal_error(other),
    }
}

fn not_found(id: &DesignJobId) -> Response {
    let payload = json!({
        "error": format!("design job {id} not found"),
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn internal_error(error: DesignServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
