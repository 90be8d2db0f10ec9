use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Electrical datasheet of a PV module as carried by the equipment catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRecord {
    pub id: String,
    pub maker: String,
    pub model: String,
    /// Nameplate power at STC, watts.
    pub max_power_w: f64,
    pub open_circuit_voltage: f64,
    pub short_circuit_current: f64,
    pub voltage_at_pmax: f64,
    pub current_at_pmax: f64,
    /// Voc temperature coefficient, %/°C (negative for silicon).
    pub temp_coeff_voc: f64,
    /// Isc temperature coefficient, %/°C.
    pub temp_coeff_isc: f64,
    pub efficiency_pct: f64,
    pub price: f64,
}

/// Electrical datasheet of a string inverter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterRecord {
    pub id: String,
    pub maker: String,
    pub model: String,
    /// Nominal AC output, watts.
    pub nominal_ac_power_w: f64,
    pub max_dc_voltage: f64,
    pub mppt_voltage_min: f64,
    pub mppt_voltage_max: f64,
    pub max_input_current_per_mppt: f64,
    pub max_short_circuit_current: f64,
    pub mppt_trackers: u8,
    pub european_efficiency_pct: f64,
    pub price: f64,
}

/// Read surface of the external equipment catalog. The pipeline consumes it,
/// it never writes back.
pub trait EquipmentCatalog: Send + Sync {
    fn panels(&self) -> Result<Vec<PanelRecord>, CatalogError>;
    fn inverters(&self) -> Result<Vec<InverterRecord>, CatalogError>;
    fn panel(&self, id: &str) -> Result<Option<PanelRecord>, CatalogError>;
    fn inverter(&self, id: &str) -> Result<Option<InverterRecord>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("equipment catalog unavailable: {0}")]
    Unavailable(String),
}

/// Fingerprint of the attributes compatibility scoring depends on. A changed
/// datasheet yields a new fingerprint, so cached matrix entries computed
/// against the old attributes are superseded rather than served stale.
pub fn electrical_fingerprint(panel: &PanelRecord, inverter: &InverterRecord) -> u64 {
    let mut hasher = DefaultHasher::new();
    for value in [
        panel.max_power_w,
        panel.open_circuit_voltage,
        panel.short_circuit_current,
        panel.voltage_at_pmax,
        panel.current_at_pmax,
        panel.temp_coeff_voc,
        panel.temp_coeff_isc,
    ] {
        value.to_bits().hash(&mut hasher);
    }
    for value in [
        inverter.nominal_ac_power_w,
        inverter.max_dc_voltage,
        inverter.mppt_voltage_min,
        inverter.mppt_voltage_max,
        inverter.max_input_current_per_mppt,
        inverter.max_short_circuit_current,
    ] {
        value.to_bits().hash(&mut hasher);
    }
    inverter.mppt_trackers.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> PanelRecord {
        PanelRecord {
            id: "pan-1".to_string(),
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
        }
    }

    fn inverter() -> InverterRecord {
        InverterRecord {
            id: "inv-1".to_string(),
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
        }
    }

    #[test]
    fn fingerprint_is_stable_for_identical_records() {
        assert_eq!(
            electrical_fingerprint(&panel(), &inverter()),
            electrical_fingerprint(&panel(), &inverter())
        );
    }

    #[test]
    fn fingerprint_changes_when_a_relevant_attribute_changes() {
        let baseline = electrical_fingerprint(&panel(), &inverter());
        let mut revised = panel();
        revised.open_circuit_voltage += 0.5;
        assert_ne!(baseline, electrical_fingerprint(&revised, &inverter()));
    }

    #[test]
    fn fingerprint_ignores_commercial_attributes() {
        let baseline = electrical_fingerprint(&panel(), &inverter());
        let mut repriced = panel();
        repriced.price += 50.0;
        assert_eq!(baseline, electrical_fingerprint(&repriced, &inverter()));
    }
}
