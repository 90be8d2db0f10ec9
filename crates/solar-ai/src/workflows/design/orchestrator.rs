use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::task;
use tokio::time::timeout;

use crate::config::PipelineConfig;

use super::aggregate::ResultAggregator;
use super::catalog::{CatalogError, EquipmentCatalog};
use super::domain::{
    DesignJobId, DesignRequirements, EquipmentSelections, LocationContext, ValidationError,
};
use super::financial::{CostInputs, FinancialAnalyzer, TariffContext};
use super::preferences::{PreferenceStore, UserPreferences};
use super::repository::{DesignJobRecord, DesignJobStore, FailureKind, StoreError};
use super::scoring::{
    CompatibilityCache, CompatibilityMatrixEntry, CompatibilityScorer, ScoringConfig,
};
use super::selection::{select_equipment, EquipmentSelection, INSTALLATION_COST_FACTOR};
use super::simulation::{ArrayParams, SimulationAdapter, SimulationEngine, SiteParams};

/// Ground reflectance assumed for every site.
const DEFAULT_ALBEDO: f64 = 0.25;

#[derive(Debug, thiserror::Error)]
pub enum DesignServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("unknown equipment id: {0}")]
    UnknownEquipment(String),
    #[error("design job {0} not found")]
    NotFound(DesignJobId),
    #[error("design job {0} has not finished; review requires a terminal job")]
    ReviewConflict(DesignJobId),
}

struct Inner<C, E, J, P> {
    catalog: C,
    simulation: SimulationAdapter<E>,
    jobs: J,
    preferences: P,
    scorer: CompatibilityScorer,
    cache: CompatibilityCache,
    pipeline: PipelineConfig,
    sequence: AtomicU64,
}

/// Drives design jobs from submission to a terminal state.
///
/// `submit` validates and persists synchronously, then hands the job to a
/// background task; callers observe progress by polling. The background task
/// is the only writer for its job, and every status change goes through the
/// record's forward-only transition methods.
pub struct DesignJobOrchestrator<C, E, J, P> {
    inner: Arc<Inner<C, E, J, P>>,
}

impl<C, E, J, P> Clone for DesignJobOrchestrator<C, E, J, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, E, J, P> DesignJobOrchestrator<C, E, J, P>
where
    C: EquipmentCatalog + 'static,
    E: SimulationEngine + 'static,
    J: DesignJobStore + 'static,
    P: PreferenceStore + 'static,
{
    pub fn new(
        catalog: C,
        engine: E,
        jobs: J,
        preferences: P,
        scoring: ScoringConfig,
        pipeline: PipelineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                catalog,
                simulation: SimulationAdapter::new(engine),
                jobs,
                preferences,
                scorer: CompatibilityScorer::new(scoring),
                cache: CompatibilityCache::new(),
                pipeline,
                sequence: AtomicU64::new(1),
            }),
        }
    }

    /// Validates the request, persists a pending job, and schedules the
    /// pipeline in the background. Returns immediately with the new record.
    pub fn submit(
        &self,
        requirements: DesignRequirements,
    ) -> Result<DesignJobRecord, DesignServiceError> {
        requirements.validate()?;

        let id = self.next_id();
        let context = LocationContext::derive(&requirements.location, None);
        let record = DesignJobRecord::new(id.clone(), requirements, context, Utc::now());
        self.inner.jobs.insert(record.clone())?;
        tracing::info!(job = %id, "design job accepted");

        let orchestrator = self.clone();
        task::spawn(async move {
            orchestrator.process(id).await;
        });

        Ok(record)
    }

    pub fn get(&self, id: &DesignJobId) -> Result<DesignJobRecord, DesignServiceError> {
        self.inner
            .jobs
            .fetch(id)?
            .ok_or_else(|| DesignServiceError::NotFound(id.clone()))
    }

    pub fn list(
        &self,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<DesignJobRecord>, usize), DesignServiceError> {
        Ok(self.inner.jobs.list(page, limit)?)
    }

    /// Flags the job for cancellation. The pipeline honours the flag at its
    /// next stage boundary; a job already in a terminal state conflicts.
    pub fn cancel(&self, id: &DesignJobId) -> Result<DesignJobRecord, DesignServiceError> {
        let record = self.inner.jobs.request_cancel(id)?;
        tracing::info!(job = %id, "cancellation requested");
        Ok(record)
    }

    /// Reviewer amendment of the equipment selections on a finished job.
    /// Only the selections change; results and estimates stay as computed.
    pub fn apply_review(
        &self,
        id: &DesignJobId,
        selections: EquipmentSelections,
    ) -> Result<DesignJobRecord, DesignServiceError> {
        let mut record = self.get(id)?;
        if !record.status.is_terminal() {
            return Err(DesignServiceError::ReviewConflict(id.clone()));
        }
        if self.inner.catalog.panel(&selections.panel_id)?.is_none() {
            return Err(DesignServiceError::UnknownEquipment(
                selections.panel_id.clone(),
            ));
        }
        if self
            .inner
            .catalog
            .inverter(&selections.inverter_id)?
            .is_none()
        {
            return Err(DesignServiceError::UnknownEquipment(
                selections.inverter_id.clone(),
            ));
        }

        record.equipment_selections = Some(selections);
        record.updated_at = Utc::now();
        self.inner.jobs.update(record.clone())?;
        tracing::info!(job = %id, "equipment selections amended by review");
        Ok(record)
    }

    /// Scores a single pair on demand, served from the matrix cache.
    pub fn compatibility(
        &self,
        panel_id: &str,
        inverter_id: &str,
    ) -> Result<Arc<CompatibilityMatrixEntry>, DesignServiceError> {
        let panel = self
            .inner
            .catalog
            .panel(panel_id)?
            .ok_or_else(|| DesignServiceError::UnknownEquipment(panel_id.to_string()))?;
        let inverter = self
            .inner
            .catalog
            .inverter(inverter_id)?
            .ok_or_else(|| DesignServiceError::UnknownEquipment(inverter_id.to_string()))?;
        Ok(self.inner.cache.score(&self.inner.scorer, &panel, &inverter))
    }

    pub fn preferences(&self) -> Result<UserPreferences, DesignServiceError> {
        Ok(self.inner.preferences.load()?)
    }

    pub fn save_preferences(
        &self,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, DesignServiceError> {
        self.inner.preferences.save(preferences.clone())?;
        Ok(preferences)
    }

    fn next_id(&self) -> DesignJobId {
        let sequence = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        DesignJobId(format!(
            "dj-{:x}-{:04x}",
            Utc::now().timestamp_millis(),
            sequence
        ))
    }

    /// Runs the pipeline for one job. Every stage boundary is a cancellation
    /// checkpoint; any failure lands the job in the failed state with the
    /// stage's failure kind.
    async fn process(self, id: DesignJobId) {
        let mut record = match self.inner.jobs.fetch(&id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::error!(job = %id, "job vanished before processing started");
                return;
            }
            Err(error) => {
                tracing::error!(job = %id, %error, "job store unavailable at start");
                return;
            }
        };

        if !record.begin_processing(Utc::now()) {
            tracing::warn!(job = %id, status = record.status.label(), "job not pending, skipping");
            return;
        }
        if self.persist(&record).is_err() {
            return;
        }
        tracing::info!(job = %id, "design pipeline started");

        if self.cancelled_at_checkpoint(&id).await {
            return;
        }

        // Equipment selection.
        let preferences = self.inner.preferences.load().unwrap_or_else(|error| {
            tracing::warn!(job = %id, %error, "preference store unavailable, using defaults");
            UserPreferences::default()
        });
        let selection = match self.run_selection(&record, &preferences) {
            Ok(Some(selection)) => selection,
            Ok(None) => {
                self.finish_failed(
                    &id,
                    FailureKind::NoCompatibleEquipment,
                    "no panel/inverter pair satisfies the target power and budget".to_string(),
                );
                return;
            }
            Err(error) => {
                self.finish_failed(&id, FailureKind::Calculation, error.to_string());
                return;
            }
        };

        let optimization = if selection.array.number_of_strings > 1 {
            format!(
                "power optimizers recommended across {} parallel strings",
                selection.array.number_of_strings
            )
        } else {
            "single string, no optimizers required".to_string()
        };
        record.record_selection(
            EquipmentSelections {
                panel_id: selection.panel.id.clone(),
                inverter_id: selection.inverter.id.clone(),
                mounting_system: record.requirements.roof_type.mounting_system().to_string(),
                optimization,
            },
            Utc::now(),
        );
        if self.persist(&record).is_err() {
            return;
        }
        tracing::info!(
            job = %id,
            panel = %selection.panel.id,
            inverter = %selection.inverter.id,
            score = selection.compatibility.overall_score,
            "equipment selected"
        );

        if self.cancelled_at_checkpoint(&id).await {
            return;
        }

        // Performance simulation, off the async runtime and under a deadline.
        let simulation = match self.run_simulation(&record, &selection).await {
            Ok(result) => result,
            Err((kind, message)) => {
                self.finish_failed(&id, kind, message);
                return;
            }
        };

        if self.cancelled_at_checkpoint(&id).await {
            return;
        }

        // Financial analysis and final assembly.
        let tariff =
            TariffContext::with_electricity_price(record.location_context.electricity_price_per_kwh);
        let costs = CostInputs {
            equipment_cost: selection.equipment_cost,
            installation_cost: selection.equipment_cost * INSTALLATION_COST_FACTOR,
        };
        let financial = match FinancialAnalyzer::analyze(&costs, &simulation, &tariff) {
            Ok(metrics) => metrics,
            Err(error) => {
                self.finish_failed(&id, FailureKind::Calculation, error.to_string());
                return;
            }
        };

        let (design, estimates, confidence) =
            ResultAggregator::assemble(&selection, &simulation, financial);
        record.complete(design, estimates, confidence, Utc::now());
        if self.persist(&record).is_ok() {
            tracing::info!(job = %id, confidence, "design job completed");
        }
    }

    fn run_selection(
        &self,
        record: &DesignJobRecord,
        preferences: &UserPreferences,
    ) -> Result<Option<EquipmentSelection>, CatalogError> {
        let panels = self.inner.catalog.panels()?;
        let inverters = self.inner.catalog.inverters()?;
        Ok(select_equipment(
            &panels,
            &inverters,
            &record.requirements,
            preferences,
            &self.inner.scorer,
            &self.inner.cache,
            self.inner.pipeline.target_power_tolerance,
        ))
    }

    async fn run_simulation(
        &self,
        record: &DesignJobRecord,
        selection: &EquipmentSelection,
    ) -> Result<super::simulation::SimulationResult, (FailureKind, String)> {
        let site = SiteParams {
            latitude: record.location_context.latitude,
            longitude: record.location_context.longitude,
            tilt_degrees: record.requirements.tilt_degrees,
            azimuth_degrees: record.requirements.orientation.azimuth_degrees(),
            solar_irradiance: record.location_context.solar_irradiance,
            albedo: DEFAULT_ALBEDO,
        };
        let array = ArrayParams {
            modules_per_string: selection.array.panels_per_string,
            strings_in_parallel: selection.array.number_of_strings,
            module_power_w: selection.panel.max_power_w,
            total_dc_power_w: selection.array.total_power_dc_w,
            inverter_ac_power_w: selection.inverter.nominal_ac_power_w,
            inverter_efficiency_pct: selection.inverter.european_efficiency_pct,
        };

        let inner = Arc::clone(&self.inner);
        let handle = task::spawn_blocking(move || inner.simulation.simulate(&site, &array));

        match timeout(self.inner.pipeline.simulation_timeout, handle).await {
            Err(_) => Err((
                FailureKind::Timeout,
                format!(
                    "simulation exceeded the {}s timeout",
                    self.inner.pipeline.simulation_timeout.as_secs()
                ),
            )),
            Ok(Err(join_error)) => Err((
                FailureKind::Simulation,
                format!("simulation worker failed: {join_error}"),
            )),
            Ok(Ok(Err(error))) => Err((FailureKind::Simulation, error.to_string())),
            Ok(Ok(Ok(result))) => Ok(result),
        }
    }

    /// Re-reads the record and finishes the job as cancelled when the flag is
    /// set. Returns whether processing must stop.
    async fn cancelled_at_checkpoint(&self, id: &DesignJobId) -> bool {
        match self.inner.jobs.fetch(id) {
            Ok(Some(record)) if record.cancel_requested => {
                self.finish_failed(
                    id,
                    FailureKind::Cancelled,
                    "cancelled by customer request".to_string(),
                );
                true
            }
            Ok(Some(_)) => false,
            Ok(None) => {
                tracing::error!(job = %id, "job vanished mid-pipeline");
                true
            }
            Err(error) => {
                tracing::error!(job = %id, %error, "job store unavailable at checkpoint");
                true
            }
        }
    }

    fn finish_failed(&self, id: &DesignJobId, kind: FailureKind, message: String) {
        let mut record = match self.inner.jobs.fetch(id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::error!(job = %id, "job vanished while recording failure");
                return;
            }
            Err(error) => {
                tracing::error!(job = %id, %error, "job store unavailable recording failure");
                return;
            }
        };
        if !record.fail(kind, message.clone(), Utc::now()) {
            tracing::warn!(job = %id, "job already terminal, failure not recorded");
            return;
        }
        if self.persist(&record).is_ok() {
            tracing::warn!(job = %id, kind = kind.label(), %message, "design job failed");
        }
    }

    /// Writes the record back. The store keeps any cancellation flag set
    /// since this task last read the record; the next checkpoint observes it.
    fn persist(&self, record: &DesignJobRecord) -> Result<(), ()> {
        if let Err(error) = self.inner.jobs.update(record.clone()) {
            tracing::error!(job = %record.id, %error, "failed to persist job update");
            return Err(());
        }
        Ok(())
    }
}
