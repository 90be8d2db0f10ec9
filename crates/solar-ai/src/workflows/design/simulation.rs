use serde::{Deserialize, Serialize};

use super::domain::EnvironmentalBenefits;

/// Grid emission factor used for CO2 offsets, kg CO2 per kWh.
const GRID_EMISSION_FACTOR: f64 = 0.5;
/// Annual CO2 absorption of a mature tree, kg.
const TREE_ABSORPTION_KG: f64 = 22.0;
/// Emission factor of coal generation, kg CO2 per kWh.
const COAL_EMISSION_FACTOR: f64 = 0.98;

/// Site parameters handed to the simulation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteParams {
    pub latitude: f64,
    pub longitude: f64,
    pub tilt_degrees: f64,
    pub azimuth_degrees: f64,
    /// Plane-of-array irradiance, kWh/m²/year.
    pub solar_irradiance: f64,
    pub albedo: f64,
}

/// Array parameters handed to the simulation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayParams {
    pub modules_per_string: u32,
    pub strings_in_parallel: u32,
    pub module_power_w: f64,
    pub total_dc_power_w: f64,
    pub inverter_ac_power_w: f64,
    pub inverter_efficiency_pct: f64,
}

/// Raw engine payload before normalization. Mirrors the external simulation
/// service's response envelope; optional fields stay optional so a partial
/// payload surfaces as an error instead of silently defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSimulationResponse {
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub annual_energy_kwh: Option<f64>,
    #[serde(default)]
    pub monthly_energy_kwh: Option<Vec<f64>>,
    /// Fraction in (0, 1].
    #[serde(default)]
    pub performance_ratio: Option<f64>,
    /// Fraction in (0, 1].
    #[serde(default)]
    pub capacity_factor: Option<f64>,
}

/// Normalized simulation output consumed by the rest of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub annual_production_kwh: f64,
    /// Exactly 12 entries, January first.
    pub monthly_production_kwh: Vec<f64>,
    pub performance_ratio_pct: f64,
    pub specific_yield_kwh_per_kwp: f64,
    pub capacity_factor_pct: f64,
    pub environmental: EnvironmentalBenefits,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("simulation engine failed: {0}")]
    Engine(String),
    #[error("malformed simulation response: {0}")]
    MalformedResponse(String),
}

/// External performance-simulation engine. Calls may take seconds; the
/// orchestrator runs them on a blocking worker under a timeout.
pub trait SimulationEngine: Send + Sync {
    fn run(&self, site: &SiteParams, array: &ArrayParams)
        -> Result<RawSimulationResponse, SimulationError>;
}

/// Normalizes engine responses into [`SimulationResult`].
///
/// Every upstream field is validated: missing, non-finite, or negative values
/// are rejected as [`SimulationError::MalformedResponse`] rather than coerced
/// to zero. Errors never escape as panics.
pub struct SimulationAdapter<E> {
    engine: E,
}

impl<E: SimulationEngine> SimulationAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn simulate(
        &self,
        site: &SiteParams,
        array: &ArrayParams,
    ) -> Result<SimulationResult, SimulationError> {
        if !(array.total_dc_power_w > 0.0) {
            return Err(SimulationError::MalformedResponse(
                "array DC power must be positive".to_string(),
            ));
        }

        let raw = self.engine.run(site, array)?;

        if !raw.success {
            let cause = raw
                .error_message
                .unwrap_or_else(|| "engine reported failure without a message".to_string());
            return Err(SimulationError::Engine(cause));
        }

        let annual = require_metric(raw.annual_energy_kwh, "annual_energy_kwh")?;
        let monthly = raw.monthly_energy_kwh.ok_or_else(|| {
            SimulationError::MalformedResponse("missing monthly_energy_kwh".to_string())
        })?;
        if monthly.len() != 12 {
            return Err(SimulationError::MalformedResponse(format!(
                "expected 12 monthly entries, got {}",
                monthly.len()
            )));
        }
        for (month, value) in monthly.iter().enumerate() {
            if !value.is_finite() || *value < 0.0 {
                return Err(SimulationError::MalformedResponse(format!(
                    "monthly energy for month {} is not a non-negative number",
                    month + 1
                )));
            }
        }

        let performance_ratio = require_fraction(raw.performance_ratio, "performance_ratio")?;
        let capacity_factor = require_fraction(raw.capacity_factor, "capacity_factor")?;

        let kwp = array.total_dc_power_w / 1000.0;
        let specific_yield = annual / kwp;

        let co2_offset_tons = annual * GRID_EMISSION_FACTOR / 1000.0;
        let environmental = EnvironmentalBenefits {
            co2_offset_tons,
            equivalent_trees: (co2_offset_tons * 1000.0 / TREE_ABSORPTION_KG).round() as u32,
            coal_displacement_tons: annual * COAL_EMISSION_FACTOR / 1000.0,
        };

        Ok(SimulationResult {
            annual_production_kwh: annual,
            monthly_production_kwh: monthly,
            performance_ratio_pct: performance_ratio * 100.0,
            specific_yield_kwh_per_kwp: specific_yield,
            capacity_factor_pct: capacity_factor * 100.0,
            environmental,
        })
    }
}

fn require_metric(value: Option<f64>, field: &str) -> Result<f64, SimulationError> {
    match value {
        Some(value) if value.is_finite() && value >= 0.0 => Ok(value),
        Some(_) => Err(SimulationError::MalformedResponse(format!(
            "{field} is not a non-negative number"
        ))),
        None => Err(SimulationError::MalformedResponse(format!(
            "missing {field}"
        ))),
    }
}

fn require_fraction(value: Option<f64>, field: &str) -> Result<f64, SimulationError> {
    match value {
        Some(value) if value.is_finite() && value > 0.0 && value <= 1.0 => Ok(value),
        Some(_) => Err(SimulationError::MalformedResponse(format!(
            "{field} must be a fraction in (0, 1]"
        ))),
        None => Err(SimulationError::MalformedResponse(format!(
            "missing {field}"
        ))),
    }
}

/// Deterministic local engine derived from the climate-zone irradiance model.
///
/// Stands in for the external PVLib service so the pipeline runs end to end
/// without a sidecar process; the numbers follow the same irradiance,
/// performance-ratio, and availability assumptions as the location model.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClimateModelEngine;

impl ClimateModelEngine {
    const PERFORMANCE_RATIO: f64 = 0.82;
    const SOILING_LOSS: f64 = 0.02;
    const AVAILABILITY: f64 = 0.98;

    /// Monthly share of annual production, January first, northern hemisphere.
    const MONTH_WEIGHTS: [f64; 12] = [
        0.045, 0.060, 0.085, 0.100, 0.110, 0.115, 0.115, 0.105, 0.090, 0.070, 0.055, 0.050,
    ];

    fn orientation_factor(azimuth_degrees: f64) -> f64 {
        let deviation = (azimuth_degrees - 180.0).abs().min(180.0);
        1.0 - deviation / 180.0 * 0.4
    }

    fn tilt_factor(tilt_degrees: f64) -> f64 {
        1.0 - (tilt_degrees - 35.0).abs() / 35.0 * 0.08
    }
}

impl SimulationEngine for ClimateModelEngine {
    fn run(
        &self,
        site: &SiteParams,
        array: &ArrayParams,
    ) -> Result<RawSimulationResponse, SimulationError> {
        let kwp = array.total_dc_power_w / 1000.0;
        let inverter_efficiency = array.inverter_efficiency_pct / 100.0;

        let annual = kwp
            * site.solar_irradiance
            * Self::PERFORMANCE_RATIO
            * inverter_efficiency
            * Self::AVAILABILITY
            * (1.0 - Self::SOILING_LOSS)
            * Self::orientation_factor(site.azimuth_degrees)
            * Self::tilt_factor(site.tilt_degrees);

        let mut monthly: Vec<f64> = Self::MONTH_WEIGHTS
            .iter()
            .map(|weight| annual * weight)
            .collect();
        if site.latitude < 0.0 {
            monthly.rotate_left(6);
        }

        Ok(RawSimulationResponse {
            success: true,
            error_message: None,
            annual_energy_kwh: Some(annual),
            monthly_energy_kwh: Some(monthly),
            performance_ratio: Some(Self::PERFORMANCE_RATIO),
            capacity_factor: Some(annual / (kwp * 8760.0)),
        })
    }
}
