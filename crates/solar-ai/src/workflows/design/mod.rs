//! Solar design pipeline: equipment selection, compatibility scoring,
//! performance simulation, and financial analysis behind a pollable job API.
//!
//! A submission is validated synchronously and accepted as a pending job;
//! everything downstream runs in a background task while clients poll the
//! job resource. Jobs only move forward through their lifecycle and always
//! land in exactly one terminal outcome.

pub(crate) mod aggregate;
pub mod catalog;
pub mod domain;
pub mod financial;
pub mod orchestrator;
pub mod preferences;
pub mod repository;
pub mod router;
pub mod scoring;
pub(crate) mod selection;
pub mod simulation;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, EquipmentCatalog, InverterRecord, PanelRecord};
pub use domain::{
    ArrayConfiguration, DesignJobId, DesignJobStatus, DesignPriority, DesignRequirements,
    DesignResult, EnvironmentalBenefits, EquipmentSelections, FieldViolation, FinancialMetrics,
    LocationContext, Orientation, PerformanceEstimates, RoofType, SiteLocation, ValidationError,
};
pub use financial::{CalculationError, CostInputs, FinancialAnalyzer, TariffContext};
pub use orchestrator::{DesignJobOrchestrator, DesignServiceError};
pub use preferences::{PreferenceStore, PriorityLevel, UserPreferences};
pub use repository::{DesignJobRecord, DesignJobStore, FailureKind, JobOutcome, StoreError};
pub use router::design_router;
pub use scoring::{
    CompatibilityCache, CompatibilityMatrixEntry, CompatibilityScorer, ScoringConfig,
    StringConfiguration,
};
pub use simulation::{
    ClimateModelEngine, RawSimulationResponse, SimulationAdapter, SimulationEngine,
    SimulationError, SimulationResult,
};
