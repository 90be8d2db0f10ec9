use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::design::design_router;
use crate::workflows::design::simulation::ClimateModelEngine;

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&body).expect("serializes"),
        ))
        .expect("request builds")
}

fn get_request(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

fn submission_body() -> serde_json::Value {
    serde_json::to_value(paris_requirements()).expect("serializes")
}

#[tokio::test]
async fn submitting_a_design_returns_created_with_an_id() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );
    let router = design_router(orchestrator);

    let response = router
        .oneshot(json_request("POST", "/api/v1/designs", submission_body()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert!(payload.get("id").is_some());
    let status = payload["status"].as_str().expect("status string");
    assert!(status == "pending" || status == "processing");
}

#[tokio::test]
async fn invalid_submission_returns_field_violations() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );
    let router = design_router(orchestrator);

    let mut body = submission_body();
    body["target_power_w"] = json!(-5.0);
    body["location"]["latitude"] = json!(123.0);

    let response = router
        .oneshot(json_request("POST", "/api/v1/designs", body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    let violations = payload["violations"].as_array().expect("violations array");
    assert_eq!(violations.len(), 2);
}

#[tokio::test]
async fn unknown_job_returns_not_found() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );
    let router = design_router(orchestrator);

    let response = router
        .oneshot(get_request("/api/v1/designs/dj-missing"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_returns_submitted_jobs_newest_first() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );
    let first = orchestrator
        .submit(paris_requirements())
        .expect("first accepted");
    let second = orchestrator
        .submit(paris_requirements())
        .expect("second accepted");
    let router = design_router(orchestrator);

    let response = router
        .oneshot(get_request("/api/v1/designs?page=1&limit=10"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total"].as_u64(), Some(2));
    let jobs = payload["jobs"].as_array().expect("jobs array");
    assert_eq!(jobs[0]["id"].as_str(), Some(second.id.0.as_str()));
    assert_eq!(jobs[1]["id"].as_str(), Some(first.id.0.as_str()));
}

#[tokio::test]
async fn listing_with_an_absurd_page_number_returns_an_empty_page() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );
    orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    let router = design_router(orchestrator);

    let response = router
        .oneshot(get_request(&format!(
            "/api/v1/designs?page={}&limit=100",
            usize::MAX
        )))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total"].as_u64(), Some(1));
    let jobs = payload["jobs"].as_array().expect("jobs array");
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn polling_a_job_eventually_shows_the_completed_payload() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );
    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    wait_for_terminal(&orchestrator, &accepted.id).await;
    let router = design_router(orchestrator);

    let response = router
        .oneshot(get_request(&format!("/api/v1/designs/{}", accepted.id)))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"].as_str(), Some("completed"));
    assert_eq!(payload["outcome"]["kind"].as_str(), Some("completed"));
    assert!(
        payload["outcome"]["performance_estimates"]["annual_production_kwh"]
            .as_f64()
            .expect("annual production")
            > 0.0
    );
}

#[tokio::test]
async fn amending_an_unfinished_job_conflicts() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        SlowEngine {
            delay: Duration::from_millis(400),
        },
        Duration::from_secs(60),
    );
    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    let router = design_router(orchestrator);

    let body = json!({
        "panel_id": "pan-longi-410",
        "inverter_id": "inv-sma-5000",
        "mounting_system": "roof-mounted",
        "optimization": "reviewer override",
    });
    let response = router
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/designs/{}", accepted.id),
            body,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_endpoint_flags_the_job() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        SlowEngine {
            delay: Duration::from_millis(400),
        },
        Duration::from_secs(60),
    );
    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    let router = design_router(orchestrator);

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/designs/{}/cancel", accepted.id),
            json!({}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["cancel_requested"].as_bool(), Some(true));
}

#[tokio::test]
async fn compatibility_endpoint_serves_known_pairs_and_404s_unknown_ones() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );
    let router = design_router(orchestrator);

    let response = router
        .clone()
        .oneshot(get_request(
            "/api/v1/compatibility/panel/pan-sunpower-400/inverter/inv-sma-5000",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let overall = payload["overall_score"].as_u64().expect("overall score");
    assert!(overall <= 100);
    assert!(payload["string_configuration"]["panels_per_string"].is_u64());

    let missing = router
        .oneshot(get_request(
            "/api/v1/compatibility/panel/pan-ghost/inverter/inv-sma-5000",
        ))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preferences_roundtrip_through_the_gateway() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );
    let router = design_router(orchestrator);

    let body = json!({
        "preferred_panel_brands": ["Longi"],
        "preferred_inverter_brands": [],
        "budget_priority": "high",
        "performance_priority": "medium",
    });
    let saved = router
        .clone()
        .oneshot(json_request("PUT", "/api/v1/preferences", body))
        .await
        .expect("route executes");
    assert_eq!(saved.status(), StatusCode::OK);

    let loaded = router
        .oneshot(get_request("/api/v1/preferences"))
        .await
        .expect("route executes");
    assert_eq!(loaded.status(), StatusCode::OK);
    let payload = read_json_body(loaded).await;
    assert_eq!(payload["preferred_panel_brands"][0].as_str(), Some("Longi"));
    assert_eq!(payload["budget_priority"].as_str(), Some("high"));
}
