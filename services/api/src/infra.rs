use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use solar_ai::workflows::design::{
    CatalogError, DesignJobId, DesignJobRecord, DesignJobStore, EquipmentCatalog, InverterRecord,
    PanelRecord, PreferenceStore, StoreError, UserPreferences,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Catalog seeded with a small set of residential equipment datasheets.
#[derive(Clone)]
pub(crate) struct InMemoryEquipmentCatalog {
    panels: Vec<PanelRecord>,
    inverters: Vec<InverterRecord>,
}

impl Default for InMemoryEquipmentCatalog {
    fn default() -> Self {
        Self {
            panels: vec![
                PanelRecord {
                    id: "pan-sunpower-max3-400".to_string(),
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
                    id: "pan-longi-himo5-410".to_string(),
                    maker: "Longi".to_string(),
                    model: "Hi-MO 5 410".to_string(),
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
                PanelRecord {
                    id: "pan-rec-alpha-430".to_string(),
                    maker: "REC".to_string(),
                    model: "Alpha Pure 430".to_string(),
                    max_power_w: 430.0,
                    open_circuit_voltage: 50.1,
                    short_circuit_current: 10.9,
                    voltage_at_pmax: 42.0,
                    current_at_pmax: 10.3,
                    temp_coeff_voc: -0.24,
                    temp_coeff_isc: 0.04,
                    efficiency_pct: 22.0,
                    price: 245.0,
                },
            ],
            inverters: vec![
                InverterRecord {
                    id: "inv-sma-sb50".to_string(),
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
                    id: "inv-fronius-primo6".to_string(),
                    maker: "Fronius".to_string(),
                    model: "Primo 6.0-1".to_string(),
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
                InverterRecord {
                    id: "inv-huawei-sun2000-8".to_string(),
                    maker: "Huawei".to_string(),
                    model: "SUN2000-8KTL".to_string(),
                    nominal_ac_power_w: 8000.0,
                    max_dc_voltage: 1100.0,
                    mppt_voltage_min: 200.0,
                    mppt_voltage_max: 950.0,
                    max_input_current_per_mppt: 22.0,
                    max_short_circuit_current: 30.0,
                    mppt_trackers: 2,
                    european_efficiency_pct: 97.5,
                    price: 1650.0,
                },
            ],
        }
    }
}

impl EquipmentCatalog for InMemoryEquipmentCatalog {
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

/// Insertion-ordered job store; listing pages newest first.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDesignJobStore {
    records: Arc<Mutex<Vec<DesignJobRecord>>>,
}

impl DesignJobStore for InMemoryDesignJobStore {
    fn insert(&self, record: DesignJobRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("job store mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::Conflict(record.id));
        }
        guard.push(record);
        Ok(())
    }

    fn update(&self, record: DesignJobRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("job store mutex poisoned");
        match guard.iter_mut().find(|existing| existing.id == record.id) {
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
        let guard = self.records.lock().expect("job store mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn list(&self, page: usize, limit: usize) -> Result<(Vec<DesignJobRecord>, usize), StoreError> {
        let guard = self.records.lock().expect("job store mutex poisoned");
        let total = guard.len();
        let records = guard
            .iter()
            .rev()
            .skip(page.saturating_sub(1).saturating_mul(limit))
            .take(limit)
            .cloned()
            .collect();
        Ok((records, total))
    }

    fn request_cancel(&self, id: &DesignJobId) -> Result<DesignJobRecord, StoreError> {
        let mut guard = self.records.lock().expect("job store mutex poisoned");
        let record = guard
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryPreferenceStore {
    preferences: Arc<Mutex<UserPreferences>>,
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn load(&self) -> Result<UserPreferences, StoreError> {
        Ok(self
            .preferences
            .lock()
            .expect("preference mutex poisoned")
            .clone())
    }

    fn save(&self, preferences: UserPreferences) -> Result<(), StoreError> {
        *self.preferences.lock().expect("preference mutex poisoned") = preferences;
        Ok(())
    }
}
