use std::time::Duration;

use chrono::Utc;

use super::common::*;
use crate::workflows::design::domain::{
    DesignJobId, DesignJobStatus, EquipmentSelections, LocationContext,
};
use crate::workflows::design::repository::{
    DesignJobRecord, DesignJobStore, FailureKind, JobOutcome, StoreError,
};
use crate::workflows::design::simulation::ClimateModelEngine;
use crate::workflows::design::DesignServiceError;

#[tokio::test]
async fn happy_path_lands_in_completed_with_full_results() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );

    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    assert_non_terminal(accepted.status);
    assert!(accepted.outcome.is_none());

    let finished = wait_for_terminal(&orchestrator, &accepted.id).await;
    assert_eq!(finished.status, DesignJobStatus::Completed);

    let selections = finished.equipment_selections.expect("selections recorded");
    assert!(!selections.panel_id.is_empty());
    assert!(!selections.inverter_id.is_empty());

    let confidence = finished.confidence_score.expect("confidence set");
    assert!(confidence <= 100);

    match finished.outcome.expect("outcome present") {
        JobOutcome::Completed {
            design_result,
            performance_estimates,
        } => {
            assert!(performance_estimates.annual_production_kwh > 0.0);
            assert_eq!(performance_estimates.monthly_production_kwh.len(), 12);
            assert!(design_result.cost.total > 0.0);
            let deviation = (design_result.array.total_power_dc_w - 6000.0).abs();
            assert!(deviation <= 600.0, "array misses target by {deviation}W");
            if let Some(payback) = performance_estimates.financial.payback_period_years {
                assert!(payback.is_finite() && payback > 0.0);
            }
        }
        JobOutcome::Failed { failure, message } => {
            panic!("expected completion, failed with {failure:?}: {message}")
        }
    }
}

#[tokio::test]
async fn invalid_requirements_are_rejected_before_any_job_exists() {
    let (orchestrator, store) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );

    let mut invalid = paris_requirements();
    invalid.target_power_w = 0.0;
    let error = orchestrator.submit(invalid).expect_err("rejected");
    assert!(matches!(error, DesignServiceError::Validation(_)));
    assert_eq!(store.total(), 0);
}

#[tokio::test]
async fn empty_catalog_fails_with_no_compatible_equipment() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::empty(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );

    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    let finished = wait_for_terminal(&orchestrator, &accepted.id).await;

    assert_eq!(finished.status, DesignJobStatus::Failed);
    assert!(finished.confidence_score.is_none());
    assert!(matches!(
        finished.outcome,
        Some(JobOutcome::Failed {
            failure: FailureKind::NoCompatibleEquipment,
            ..
        })
    ));
}

#[tokio::test]
async fn slow_simulation_fails_with_a_timeout() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        SlowEngine {
            delay: Duration::from_millis(500),
        },
        Duration::from_millis(50),
    );

    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    let finished = wait_for_terminal(&orchestrator, &accepted.id).await;

    assert_eq!(finished.status, DesignJobStatus::Failed);
    match finished.outcome.expect("outcome present") {
        JobOutcome::Failed { failure, message } => {
            assert_eq!(failure, FailureKind::Timeout);
            assert!(message.contains("timeout"), "message was {message}");
        }
        JobOutcome::Completed { .. } => panic!("expected a timeout failure"),
    }
}

#[tokio::test]
async fn engine_failure_surfaces_as_a_simulation_failure() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        FailingEngine,
        Duration::from_secs(60),
    );

    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    let finished = wait_for_terminal(&orchestrator, &accepted.id).await;

    assert_eq!(finished.status, DesignJobStatus::Failed);
    match finished.outcome.expect("outcome present") {
        JobOutcome::Failed { failure, message } => {
            assert_eq!(failure, FailureKind::Simulation);
            assert!(message.contains("irradiance"), "message was {message}");
        }
        JobOutcome::Completed { .. } => panic!("expected a simulation failure"),
    }
}

#[tokio::test]
async fn cancellation_during_simulation_lands_in_cancelled() {
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
    tokio::time::sleep(Duration::from_millis(50)).await;
    let flagged = orchestrator.cancel(&accepted.id).expect("cancel accepted");
    assert!(flagged.cancel_requested);

    let finished = wait_for_terminal(&orchestrator, &accepted.id).await;
    assert_eq!(finished.status, DesignJobStatus::Failed);
    assert!(matches!(
        finished.outcome,
        Some(JobOutcome::Failed {
            failure: FailureKind::Cancelled,
            ..
        })
    ));
}

#[tokio::test]
async fn cancelling_a_finished_job_conflicts() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );

    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    wait_for_terminal(&orchestrator, &accepted.id).await;

    let error = orchestrator.cancel(&accepted.id).expect_err("conflict");
    assert!(matches!(
        error,
        DesignServiceError::Store(StoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn identical_submissions_become_independent_jobs() {
    let (orchestrator, store) = build_orchestrator(
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
    assert_ne!(first.id, second.id);

    let first = wait_for_terminal(&orchestrator, &first.id).await;
    let second = wait_for_terminal(&orchestrator, &second.id).await;
    assert_eq!(first.status, DesignJobStatus::Completed);
    assert_eq!(second.status, DesignJobStatus::Completed);
    assert_eq!(store.total(), 2);
}

#[tokio::test]
async fn review_amends_selections_on_a_finished_job_only() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );

    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    let finished = wait_for_terminal(&orchestrator, &accepted.id).await;
    let original_outcome = finished.outcome.clone();

    let amended = orchestrator
        .apply_review(
            &accepted.id,
            EquipmentSelections {
                panel_id: "pan-longi-410".to_string(),
                inverter_id: "inv-fronius-6000".to_string(),
                mounting_system: "roof-mounted".to_string(),
                optimization: "reviewer override".to_string(),
            },
        )
        .expect("review applies");

    let selections = amended.equipment_selections.expect("selections present");
    assert_eq!(selections.panel_id, "pan-longi-410");
    // Computed results stay as the pipeline produced them.
    assert_eq!(amended.outcome, original_outcome);
}

#[tokio::test]
async fn review_rejects_unknown_equipment() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );

    let accepted = orchestrator
        .submit(paris_requirements())
        .expect("submission accepted");
    wait_for_terminal(&orchestrator, &accepted.id).await;

    let error = orchestrator
        .apply_review(
            &accepted.id,
            EquipmentSelections {
                panel_id: "pan-nonexistent".to_string(),
                inverter_id: "inv-sma-5000".to_string(),
                mounting_system: "roof-mounted".to_string(),
                optimization: String::new(),
            },
        )
        .expect_err("unknown equipment rejected");
    assert!(matches!(error, DesignServiceError::UnknownEquipment(_)));
}

#[test]
fn store_update_keeps_a_cancellation_flag_set_after_the_read() {
    let store = MemoryJobStore::default();
    let requirements = paris_requirements();
    let context = LocationContext::derive(&requirements.location, None);
    let record = DesignJobRecord::new(
        DesignJobId("dj-cancel-race".to_string()),
        requirements,
        context,
        Utc::now(),
    );
    store.insert(record.clone()).expect("inserts");

    store.request_cancel(&record.id).expect("flags");
    // A writer still holding the pre-cancel copy writes it back.
    store.update(record.clone()).expect("updates");

    let stored = store.fetch(&record.id).expect("fetches").expect("exists");
    assert!(stored.cancel_requested);
}

#[tokio::test]
async fn compatibility_lookup_is_deterministic() {
    let (orchestrator, _) = build_orchestrator(
        MemoryCatalog::realistic(),
        ClimateModelEngine,
        Duration::from_secs(60),
    );

    let first = orchestrator
        .compatibility("pan-sunpower-400", "inv-sma-5000")
        .expect("scores");
    let second = orchestrator
        .compatibility("pan-sunpower-400", "inv-sma-5000")
        .expect("scores again");
    assert_eq!(first.as_ref(), second.as_ref());
    assert!(first.overall_score <= 100);
}
