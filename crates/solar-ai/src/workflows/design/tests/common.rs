use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::workflows::design::catalog::{
    CatalogError, EquipmentCatalog, InverterRecord, PanelRecord,
};
use crate::workflows::design::domain::{
    DesignJobId, DesignJobStatus, DesignPriority, DesignRequirements, Orientation, RoofType,
    SiteLocation,
};
use crate::workflows::design::preferences::{PreferenceStore, UserPreferences};
use crate::workflows::design::repository::{DesignJobRecord, DesignJobStore, StoreError};
use crate::workflows::design::scoring::ScoringConfig;
use crate::workflows::design::simulation::{
    ArrayParams, ClimateModelEngine, RawSimulationResponse, SimulationEngine, SimulationError,
    SiteParams,
};
use crate::workflows::design::DesignJobOrchestrator;

pub(super) type TestOrchestrator<E> =
    DesignJobOrchestrator<MemoryCatalog, E, MemoryJobStore, MemoryPreferences>;

#[derive(Clone)]
pub(super) struct MemoryCatalog {
    panels: Vec<PanelRecord>,
    inverters: Vec<InverterRecord>,
}

impl MemoryCatalog {
    pub(super) fn realistic() -> Self {
        Self {
            panels: vec![
                PanelRecord {
                    id: "pan-sunpower-400".to_string(),
                    maker: "SunPower".to_string(),
                    model: "MAX3-400".to_string(),
                    max_power_w: 400.0,
                    open_circuit_voltage: 45.3,
                    short_circuit_current: 10.8,
                    voltage_at_pmax: 37.9,
                    current_at_pmax: 10.6,
                    temp_coeff_voc: -0.27,
                    temp_coeff_isc: 0.05,
                    efficiency_pct: 21.2,
                    price: 210.0,
                },
                PanelRecord {
                    id: "pan-longi-410".to_string(),
                    maker: "Longi".to_string(),
                    model: "Hi-MO 5".to_string(),
                    max_power_w: 410.0,
                    open_circuit_voltage: 46.1,
                    short_circuit_current: 11.2,
                    voltage_at_pmax: 38.5,
                    current_at_pmax: 10.7,
                    temp_coeff_voc: -0.28,
                    temp_coeff_isc: 0.05,
                    efficiency_pct: 21.0,
                    price: 185.0,
                },
            ],
            inverters: vec![
                InverterRecord {
                    id: "inv-sma-5000".to_string(),
                    maker: "SMA".to_string(),
                    model: "Sunny Boy 5.0".to_string(),
                    nominal_ac_power_w: 5000.0,
                    max_dc_voltage: 600.0,
                    mppt_voltage_min: 175.0,
                    mppt_voltage_max: 500.0,
                    max_input_current_per_mppt: 15.0,
                    max_short_circuit_current: 25.0,
                    mppt_trackers: 2,
                    european_efficiency_pct: 96.5,
                    price: 1250.0,
                },
                InverterRecord {
                    id: "inv-fronius-6000".to_string(),
                    maker: "Fronius".to_string(),
                    model: "Primo 6.0".to_string(),
                    nominal_ac_power_w: 6000.0,
                    max_dc_voltage: 1000.0,
                    mppt_voltage_min: 240.0,
                    mppt_voltage_max: 800.0,
                    max_input_current_per_mppt: 18.0,
                    max_short_circuit_current: 27.0,
                    mppt_trackers: 2,
                    european_efficiency_pct: 97.1,
                    price: 1480.0,
                },
            ],
        }
    }

    pub(super) fn empty() -> Self {
        Self {
            panels: Vec::new(),
            inverters: Vec::new(),
        }
    }
}

impl EquipmentCatalog for MemoryCatalog {
    fn panels(&self) -> Result<Vec<PanelRecord>, CatalogError> {
        Ok(self.panels.clone())
    }

    fn inverters(&self) -> Result<Vec<InverterRecord>, CatalogError> {
        Ok(self.inverters.clone())
    }

    fn panel(&self, id: &str) -> Result<Option<PanelRecord>, CatalogError> {
        Ok(self.panels.iter().find(|panel| panel.id == id).cloned())
    }

    fn inverter(&self, id: &str) -> Result<Option<InverterRecord>, CatalogError> {
        Ok(self
            .inverters
            .iter()
            .find(|inverter| inverter.id == id)
            .cloned())
    }
}

/// Insertion-ordered in-memory job store shared between test and orchestrator.
#[derive(Clone, Default)]
pub(super) struct MemoryJobStore {
    records: Arc<Mutex<Vec<DesignJobRecord>>>,
}

impl MemoryJobStore {
    pub(super) fn total(&self) -> usize {
        self.records.lock().expect("job store poisoned").len()
    }
}

impl DesignJobStore for MemoryJobStore {
    fn insert(&self, record: DesignJobRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("job store poisoned");
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::Conflict(record.id));
        }
        records.push(record);
        Ok(())
    }

    fn update(&self, record: DesignJobRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("job store poisoned");
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => {
                let mut record = record;
                record.cancel_requested |= existing.cancel_requested;
                *existing = record;
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id)),
        }
    }

    fn fetch(&self, id: &DesignJobId) -> Result<Option<DesignJobRecord>, StoreError> {
        let records = self.records.lock().expect("job store poisoned");
        Ok(records.iter().find(|record| &record.id == id).cloned())
    }

    fn list(&self, page: usize, limit: usize) -> Result<(Vec<DesignJobRecord>, usize), StoreError> {
        let records = self.records.lock().expect("job store poisoned");
        let total = records.len();
        let newest_first: Vec<DesignJobRecord> = records
            .iter()
            .rev()
            .skip(page.saturating_sub(1).saturating_mul(limit))
            .take(limit)
            .cloned()
            .collect();
        Ok((newest_first, total))
    }

    fn request_cancel(&self, id: &DesignJobId) -> Result<DesignJobRecord, StoreError> {
        let mut records = self.records.lock().expect("job store poisoned");
        let record = records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if record.status.is_terminal() {
            return Err(StoreError::Conflict(id.clone()));
        }
        record.cancel_requested = true;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[derive(Clone, Default)]
pub(super) struct MemoryPreferences {
    inner: Arc<Mutex<UserPreferences>>,
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self) -> Result<UserPreferences, StoreError> {
        Ok(self.inner.lock().expect("preferences poisoned").clone())
    }

    fn save(&self, preferences: UserPreferences) -> Result<(), StoreError> {
        *self.inner.lock().expect("preferences poisoned") = preferences;
        Ok(())
    }
}

/// Delegates to the climate model after a blocking delay, for timeout and
/// cancellation scenarios.
pub(super) struct SlowEngine {
    pub(super) delay: Duration,
}

impl SimulationEngine for SlowEngine {
    fn run(
        &self,
        site: &SiteParams,
        array: &ArrayParams,
    ) -> Result<RawSimulationResponse, SimulationError> {
        std::thread::sleep(self.delay);
        ClimateModelEngine.run(site, array)
    }
}

pub(super) struct FailingEngine;

impl SimulationEngine for FailingEngine {
    fn run(
        &self,
        _site: &SiteParams,
        _array: &ArrayParams,
    ) -> Result<RawSimulationResponse, SimulationError> {
        Ok(RawSimulationResponse {
            success: false,
            error_message: Some("irradiance dataset unavailable".to_string()),
            annual_energy_kwh: None,
            monthly_energy_kwh: None,
            performance_ratio: None,
            capacity_factor: None,
        })
    }
}

pub(super) fn paris_requirements() -> DesignRequirements {
    DesignRequirements {
        target_power_w: 6000.0,
        budget: 0.0,
        roof_type: RoofType::Tilted,
        orientation: Orientation::South,
        tilt_degrees: 30.0,
        priority: DesignPriority::Efficiency,
        constraints: Vec::new(),
        location: SiteLocation {
            latitude: 48.8566,
            longitude: 2.3522,
        },
    }
}

pub(super) fn build_orchestrator<E: SimulationEngine + 'static>(
    catalog: MemoryCatalog,
    engine: E,
    simulation_timeout: Duration,
) -> (TestOrchestrator<E>, MemoryJobStore) {
    let store = MemoryJobStore::default();
    let orchestrator = DesignJobOrchestrator::new(
        catalog,
        engine,
        store.clone(),
        MemoryPreferences::default(),
        ScoringConfig::default(),
        PipelineConfig {
            simulation_timeout,
            target_power_tolerance: 0.10,
        },
    );
    (orchestrator, store)
}

/// Polls the job until it reaches a terminal state, panicking after roughly
/// five seconds of waiting.
pub(super) async fn wait_for_terminal<E: SimulationEngine + 'static>(
    orchestrator: &TestOrchestrator<E>,
    id: &DesignJobId,
) -> DesignJobRecord {
    for _ in 0..500 {
        let record = orchestrator.get(id).expect("job exists");
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} never reached a terminal state");
}

pub(super) fn assert_non_terminal(status: DesignJobStatus) {
    assert!(
        matches!(status, DesignJobStatus::Pending | DesignJobStatus::Processing),
        "unexpected status {status:?}"
    );
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}
