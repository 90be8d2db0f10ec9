use serde::{Deserialize, Serialize};

/// Fixed configuration table for compatibility scoring.
///
/// The weights and band edges are deliberately configuration rather than
/// per-call literals; the defaults below are the documented constants used by
/// the service (weights sum to 1.0, DC/AC band per common oversizing practice,
/// design temperatures bracketing the cell temperature extremes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub voltage_weight: f64,
    pub current_weight: f64,
    pub power_weight: f64,
    pub temperature_weight: f64,
    /// Acceptable DC/AC oversizing band, inclusive.
    pub oversizing_min: f64,
    pub oversizing_max: f64,
    /// Ratio at which the power sub-score peaks.
    pub oversizing_sweet_spot: f64,
    /// Coldest cell temperature assumed for Voc recalculation, °C.
    pub cold_design_temp_c: f64,
    /// Hottest cell temperature assumed for Voc/Isc recalculation, °C.
    pub hot_design_temp_c: f64,
    /// Utilization below which voltage/current headroom earns a full score.
    pub full_score_margin: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            voltage_weight: 0.30,
            current_weight: 0.20,
            power_weight: 0.30,
            temperature_weight: 0.20,
            oversizing_min: 1.00,
            oversizing_max: 1.35,
            oversizing_sweet_spot: 1.10,
            cold_design_temp_c: -10.0,
            hot_design_temp_c: 70.0,
            full_score_margin: 0.85,
        }
    }
}
